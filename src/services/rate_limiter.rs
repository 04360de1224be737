//! Rate limiter for login attempts
//!
//! Two sliding windows guard the login endpoint:
//! - failed attempts per username (default 5 per 15 minutes)
//! - requests per client IP (default 10 per minute)

use crate::config::AuthConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Login rate limiter
pub struct LoginRateLimiter {
    /// Failed login attempts by username
    username_attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    /// Request attempts by IP address
    ip_attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
    max_attempts: usize,
    username_window: Duration,
    max_ip_requests: usize,
    ip_window: Duration,
}

impl LoginRateLimiter {
    /// Create a rate limiter with the default limits
    pub fn new() -> Self {
        Self::from_config(&AuthConfig::default())
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            username_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_attempts: Arc::new(RwLock::new(HashMap::new())),
            max_attempts: config.login_max_attempts,
            username_window: Duration::minutes(config.login_window_minutes),
            max_ip_requests: config.ip_max_requests,
            ip_window: Duration::seconds(config.ip_window_seconds),
        }
    }

    /// Check if username is rate limited
    pub async fn is_username_limited(&self, username: &str) -> bool {
        let mut attempts = self.username_attempts.write().await;
        let cutoff = Utc::now() - self.username_window;

        let username_attempts = attempts.entry(username.to_lowercase()).or_default();
        username_attempts.retain(|time| *time > cutoff);

        username_attempts.len() >= self.max_attempts
    }

    /// Record a failed login attempt for username
    pub async fn record_failed_attempt(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts
            .entry(username.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Clear failed attempts for username (on successful login)
    pub async fn clear_username_attempts(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts.remove(&username.to_lowercase());
    }

    /// Check if IP is rate limited
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.ip_attempts.write().await;
        let cutoff = Utc::now() - self.ip_window;

        let ip_attempts = attempts.entry(ip).or_default();
        ip_attempts.retain(|time| *time > cutoff);

        ip_attempts.len() >= self.max_ip_requests
    }

    /// Record a request from IP
    pub async fn record_ip_request(&self, ip: IpAddr) {
        let mut attempts = self.ip_attempts.write().await;
        attempts.entry(ip).or_default().push(Utc::now());
    }

    /// Drop entries that fell out of their window
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let username_cutoff = now - self.username_window;
        let ip_cutoff = now - self.ip_window;

        {
            let mut attempts = self.username_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > username_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut attempts = self.ip_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }

    /// Number of usernames and IPs currently tracked
    pub async fn tracked(&self) -> (usize, usize) {
        (
            self.username_attempts.read().await.len(),
            self.ip_attempts.read().await.len(),
        )
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
