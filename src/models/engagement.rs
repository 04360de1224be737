//! Comments, likes and views on destinations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub destination_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(destination_id: i64, user_id: i64, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            destination_id,
            user_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Comment joined with its author's public name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub author_display_name: Option<String>,
}

/// Like state returned after a toggle or check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

/// Who looked at a destination, used to deduplicate views
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Logged-in user
    User(i64),
    /// Anonymous visitor, md5 of IP and User-Agent
    Fingerprint(String),
}

impl Viewer {
    /// Identity for a request: the user when logged in, else a client fingerprint
    pub fn identify(user_id: Option<i64>, ip: &str, user_agent: &str) -> Self {
        match user_id {
            Some(id) => Viewer::User(id),
            None => Viewer::Fingerprint(fingerprint(ip, user_agent)),
        }
    }
}

/// Anonymous client fingerprint
pub fn fingerprint(ip: &str, user_agent: &str) -> String {
    format!("{:x}", md5::compute(format!("{}:{}", ip, user_agent)))
}
