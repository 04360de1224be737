//! Engagement repository
//!
//! Comments, likes and views. Each write also adjusts the denormalized
//! counter on the destination inside the same transaction.

use crate::db::pool::Backend;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor, LikeStatus, ListParams, Viewer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Insert a comment and bump the destination's comment count
    async fn add_comment(&self, comment: &Comment) -> Result<Comment>;

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>>;

    /// Delete a comment and decrement the destination's comment count
    async fn delete_comment(&self, comment: &Comment) -> Result<()>;

    /// Newest first, with author names
    async fn list_comments(&self, destination_id: i64, params: &ListParams) -> Result<(Vec<CommentWithAuthor>, i64)>;

    /// Like when not liked, unlike otherwise
    async fn toggle_like(&self, destination_id: i64, user_id: i64) -> Result<LikeStatus>;

    async fn is_liked(&self, destination_id: i64, user_id: i64) -> Result<bool>;

    /// Record a view unless the same viewer was seen since `since`.
    ///
    /// Returns whether the view was counted.
    async fn record_view(&self, destination_id: i64, viewer: &Viewer, since: DateTime<Utc>) -> Result<bool>;
}

pub struct SqlxEngagementRepository {
    pool: DynDatabasePool,
}

impl SqlxEngagementRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EngagementRepository> {
        Arc::new(Self::new(pool))
    }

    async fn like_count(&self, destination_id: i64) -> Result<i64> {
        let sql = "SELECT like_count FROM destinations WHERE id = ?";
        let count = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(destination_id)
                .fetch_optional(pool)
                .await
                .context("Failed to read like count")?
                .map(|row| row.get("like_count")),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(destination_id)
                .fetch_optional(pool)
                .await
                .context("Failed to read like count")?
                .map(|row| row.get("like_count")),
        };
        Ok(count.unwrap_or(0))
    }
}

const INSERT_COMMENT: &str =
    "INSERT INTO comments (destination_id, user_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)";
const INCREMENT_COMMENTS: &str = "UPDATE destinations SET comment_count = comment_count + 1 WHERE id = ?";
const DECREMENT_COMMENTS: &str =
    "UPDATE destinations SET comment_count = CASE WHEN comment_count > 0 THEN comment_count - 1 ELSE 0 END WHERE id = ?";
const SELECT_COMMENT: &str =
    "SELECT id, destination_id, user_id, content, created_at, updated_at FROM comments WHERE id = ?";

const LIST_COMMENTS: &str = r#"
    SELECT c.id, c.destination_id, c.user_id, c.content, c.created_at, c.updated_at,
           u.username AS author_username, u.display_name AS author_display_name
    FROM comments c
    JOIN users u ON u.id = c.user_id
    WHERE c.destination_id = ?
    ORDER BY c.created_at DESC, c.id DESC
    LIMIT ? OFFSET ?
"#;

const SELECT_LIKE: &str = "SELECT id FROM likes WHERE destination_id = ? AND user_id = ?";
const INSERT_LIKE: &str = "INSERT INTO likes (destination_id, user_id, created_at) VALUES (?, ?, ?)";
const DELETE_LIKE: &str = "DELETE FROM likes WHERE id = ?";
const INCREMENT_LIKES: &str = "UPDATE destinations SET like_count = like_count + 1 WHERE id = ?";
const DECREMENT_LIKES: &str =
    "UPDATE destinations SET like_count = CASE WHEN like_count > 0 THEN like_count - 1 ELSE 0 END WHERE id = ?";

const RECENT_VIEW_BY_USER: &str =
    "SELECT COUNT(*) AS count FROM destination_views WHERE destination_id = ? AND user_id = ? AND created_at >= ?";
const RECENT_VIEW_BY_FINGERPRINT: &str =
    "SELECT COUNT(*) AS count FROM destination_views WHERE destination_id = ? AND fingerprint = ? AND created_at >= ?";
const INSERT_VIEW: &str =
    "INSERT INTO destination_views (destination_id, user_id, fingerprint, created_at) VALUES (?, ?, ?, ?)";
const INCREMENT_VIEWS: &str = "UPDATE destinations SET view_count = view_count + 1 WHERE id = ?";

fn viewer_columns(viewer: &Viewer) -> (&'static str, Option<i64>, Option<&str>) {
    match viewer {
        Viewer::User(id) => (RECENT_VIEW_BY_USER, Some(*id), None),
        Viewer::Fingerprint(fp) => (RECENT_VIEW_BY_FINGERPRINT, None, Some(fp.as_str())),
    }
}

#[async_trait]
impl EngagementRepository for SqlxEngagementRepository {
    async fn add_comment(&self, comment: &Comment) -> Result<Comment> {
        let now = Utc::now();
        let id = match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let id = sqlx::query(INSERT_COMMENT)
                    .bind(comment.destination_id)
                    .bind(comment.user_id)
                    .bind(&comment.content)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to create comment")?
                    .last_insert_rowid();
                sqlx::query(INCREMENT_COMMENTS)
                    .bind(comment.destination_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update comment count")?;
                tx.commit().await.context("Failed to commit comment")?;
                id
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let id = sqlx::query(INSERT_COMMENT)
                    .bind(comment.destination_id)
                    .bind(comment.user_id)
                    .bind(&comment.content)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to create comment")?
                    .last_insert_id() as i64;
                sqlx::query(INCREMENT_COMMENTS)
                    .bind(comment.destination_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update comment count")?;
                tx.commit().await.context("Failed to commit comment")?;
                id
            }
        };

        Ok(Comment {
            id,
            created_at: now,
            updated_at: now,
            ..comment.clone()
        })
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let comment = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(SELECT_COMMENT)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get comment")?
                .map(|row| Comment {
                    id: row.get("id"),
                    destination_id: row.get("destination_id"),
                    user_id: row.get("user_id"),
                    content: row.get("content"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }),
            Backend::Mysql(pool) => sqlx::query(SELECT_COMMENT)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get comment")?
                .map(|row| Comment {
                    id: row.get("id"),
                    destination_id: row.get("destination_id"),
                    user_id: row.get("user_id"),
                    content: row.get("content"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }),
        };
        Ok(comment)
    }

    async fn delete_comment(&self, comment: &Comment) -> Result<()> {
        let delete = "DELETE FROM comments WHERE id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let removed = sqlx::query(delete)
                    .bind(comment.id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete comment")?
                    .rows_affected();
                if removed > 0 {
                    sqlx::query(DECREMENT_COMMENTS)
                        .bind(comment.destination_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to update comment count")?;
                }
                tx.commit().await.context("Failed to commit comment delete")?;
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let removed = sqlx::query(delete)
                    .bind(comment.id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete comment")?
                    .rows_affected();
                if removed > 0 {
                    sqlx::query(DECREMENT_COMMENTS)
                        .bind(comment.destination_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to update comment count")?;
                }
                tx.commit().await.context("Failed to commit comment delete")?;
            }
        }
        Ok(())
    }

    async fn list_comments(&self, destination_id: i64, params: &ListParams) -> Result<(Vec<CommentWithAuthor>, i64)> {
        let count_sql = "SELECT COUNT(*) AS count FROM comments WHERE destination_id = ?";
        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let total: i64 = sqlx::query(count_sql)
                    .bind(destination_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count comments")?
                    .get("count");
                let rows = sqlx::query(LIST_COMMENTS)
                    .bind(destination_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?;
                let comments = rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        comment: Comment {
                            id: row.get("id"),
                            destination_id: row.get("destination_id"),
                            user_id: row.get("user_id"),
                            content: row.get("content"),
                            created_at: row.get("created_at"),
                            updated_at: row.get("updated_at"),
                        },
                        author_username: row.get("author_username"),
                        author_display_name: row.get("author_display_name"),
                    })
                    .collect();
                Ok((comments, total))
            }
            Backend::Mysql(pool) => {
                let total: i64 = sqlx::query(count_sql)
                    .bind(destination_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count comments")?
                    .get("count");
                let rows = sqlx::query(LIST_COMMENTS)
                    .bind(destination_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?;
                let comments = rows
                    .iter()
                    .map(|row| CommentWithAuthor {
                        comment: Comment {
                            id: row.get("id"),
                            destination_id: row.get("destination_id"),
                            user_id: row.get("user_id"),
                            content: row.get("content"),
                            created_at: row.get("created_at"),
                            updated_at: row.get("updated_at"),
                        },
                        author_username: row.get("author_username"),
                        author_display_name: row.get("author_display_name"),
                    })
                    .collect();
                Ok((comments, total))
            }
        }
    }

    async fn toggle_like(&self, destination_id: i64, user_id: i64) -> Result<LikeStatus> {
        let now = Utc::now();
        let liked = match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let existing: Option<i64> = sqlx::query(SELECT_LIKE)
                    .bind(destination_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("Failed to read like")?
                    .map(|row| row.get("id"));
                let liked = match existing {
                    Some(like_id) => {
                        sqlx::query(DELETE_LIKE).bind(like_id).execute(&mut *tx).await?;
                        sqlx::query(DECREMENT_LIKES).bind(destination_id).execute(&mut *tx).await?;
                        false
                    }
                    None => {
                        sqlx::query(INSERT_LIKE)
                            .bind(destination_id)
                            .bind(user_id)
                            .bind(now)
                            .execute(&mut *tx)
                            .await
                            .context("Failed to create like")?;
                        sqlx::query(INCREMENT_LIKES).bind(destination_id).execute(&mut *tx).await?;
                        true
                    }
                };
                tx.commit().await.context("Failed to commit like")?;
                liked
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let existing: Option<i64> = sqlx::query(SELECT_LIKE)
                    .bind(destination_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("Failed to read like")?
                    .map(|row| row.get("id"));
                let liked = match existing {
                    Some(like_id) => {
                        sqlx::query(DELETE_LIKE).bind(like_id).execute(&mut *tx).await?;
                        sqlx::query(DECREMENT_LIKES).bind(destination_id).execute(&mut *tx).await?;
                        false
                    }
                    None => {
                        sqlx::query(INSERT_LIKE)
                            .bind(destination_id)
                            .bind(user_id)
                            .bind(now)
                            .execute(&mut *tx)
                            .await
                            .context("Failed to create like")?;
                        sqlx::query(INCREMENT_LIKES).bind(destination_id).execute(&mut *tx).await?;
                        true
                    }
                };
                tx.commit().await.context("Failed to commit like")?;
                liked
            }
        };

        Ok(LikeStatus {
            liked,
            like_count: self.like_count(destination_id).await?,
        })
    }

    async fn is_liked(&self, destination_id: i64, user_id: i64) -> Result<bool> {
        let found = match self.pool.backend()? {
            Backend::Sqlite(pool) => sqlx::query(SELECT_LIKE)
                .bind(destination_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await
                .context("Failed to read like")?
                .is_some(),
            Backend::Mysql(pool) => sqlx::query(SELECT_LIKE)
                .bind(destination_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await
                .context("Failed to read like")?
                .is_some(),
        };
        Ok(found)
    }

    async fn record_view(&self, destination_id: i64, viewer: &Viewer, since: DateTime<Utc>) -> Result<bool> {
        let (recent_sql, user_id, fingerprint) = viewer_columns(viewer);
        let now = Utc::now();

        match self.pool.backend()? {
            Backend::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let recent = sqlx::query(recent_sql).bind(destination_id);
                let recent = match viewer {
                    Viewer::User(id) => recent.bind(*id),
                    Viewer::Fingerprint(fp) => recent.bind(fp.as_str()),
                };
                let seen: i64 = recent
                    .bind(since)
                    .fetch_one(&mut *tx)
                    .await
                    .context("Failed to check recent views")?
                    .get("count");
                if seen > 0 {
                    return Ok(false);
                }
                sqlx::query(INSERT_VIEW)
                    .bind(destination_id)
                    .bind(user_id)
                    .bind(fingerprint)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to record view")?;
                sqlx::query(INCREMENT_VIEWS)
                    .bind(destination_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update view count")?;
                tx.commit().await.context("Failed to commit view")?;
            }
            Backend::Mysql(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                let recent = sqlx::query(recent_sql).bind(destination_id);
                let recent = match viewer {
                    Viewer::User(id) => recent.bind(*id),
                    Viewer::Fingerprint(fp) => recent.bind(fp.as_str()),
                };
                let seen: i64 = recent
                    .bind(since)
                    .fetch_one(&mut *tx)
                    .await
                    .context("Failed to check recent views")?
                    .get("count");
                if seen > 0 {
                    return Ok(false);
                }
                sqlx::query(INSERT_VIEW)
                    .bind(destination_id)
                    .bind(user_id)
                    .bind(fingerprint)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to record view")?;
                sqlx::query(INCREMENT_VIEWS)
                    .bind(destination_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update view count")?;
                tx.commit().await.context("Failed to commit view")?;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CategoryRepository, DestinationRepository, SqlxCategoryRepository, SqlxDestinationRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{fingerprint, Category, Destination, User, UserRole};
    use chrono::Duration;

    struct Fixture {
        repo: SqlxEngagementRepository,
        destinations: SqlxDestinationRepository,
        destination_id: i64,
        alice: i64,
        bob: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let alice = users
            .create(&User::new("alice".into(), "alice@x.io".into(), "h".into(), UserRole::User))
            .await
            .unwrap();
        let mut bob = User::new("bob".into(), "bob@x.io".into(), "h".into(), UserRole::ServiceProvider);
        bob.display_name = Some("Bob's Tours".into());
        let bob = users.create(&bob).await.unwrap();

        let category = SqlxCategoryRepository::new(pool.clone())
            .create(&Category::new("beach".into(), "Beach".into(), None, 0))
            .await
            .unwrap();
        let destinations = SqlxDestinationRepository::new(pool.clone());
        let mut destination = Destination::new("reef".into(), "Reef".into(), "Coral".into(), category.id, bob.id);
        destination.mark_approved(bob.id);
        let destination = destinations.create(&destination).await.unwrap();

        Fixture {
            repo: SqlxEngagementRepository::new(pool),
            destinations,
            destination_id: destination.id,
            alice: alice.id,
            bob: bob.id,
        }
    }

    async fn counters(f: &Fixture) -> (i64, i64, i64) {
        let d = f.destinations.get_by_id(f.destination_id).await.unwrap().unwrap();
        (d.view_count, d.like_count, d.comment_count)
    }

    #[tokio::test]
    async fn test_comments_update_counter_and_list_newest_first() {
        let f = setup().await;
        let first = f
            .repo
            .add_comment(&Comment::new(f.destination_id, f.alice, "Lovely".into()))
            .await
            .unwrap();
        f.repo
            .add_comment(&Comment::new(f.destination_id, f.bob, "Thanks!".into()))
            .await
            .unwrap();
        assert_eq!(counters(&f).await.2, 2);

        let (comments, total) = f
            .repo
            .list_comments(f.destination_id, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(comments[0].comment.content, "Thanks!");
        assert_eq!(comments[0].author_display_name.as_deref(), Some("Bob's Tours"));
        assert_eq!(comments[1].author_username, "alice");

        f.repo.delete_comment(&first).await.unwrap();
        assert!(f.repo.get_comment(first.id).await.unwrap().is_none());
        assert_eq!(counters(&f).await.2, 1);
    }

    #[tokio::test]
    async fn test_toggle_like_twice_restores_state() {
        let f = setup().await;
        let liked = f.repo.toggle_like(f.destination_id, f.alice).await.unwrap();
        assert_eq!(liked, LikeStatus { liked: true, like_count: 1 });
        assert!(f.repo.is_liked(f.destination_id, f.alice).await.unwrap());

        f.repo.toggle_like(f.destination_id, f.bob).await.unwrap();
        let unliked = f.repo.toggle_like(f.destination_id, f.alice).await.unwrap();
        assert_eq!(unliked, LikeStatus { liked: false, like_count: 1 });
        assert!(!f.repo.is_liked(f.destination_id, f.alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_views_are_deduplicated_per_viewer() {
        let f = setup().await;
        let since = Utc::now() - Duration::hours(24);
        let anon = Viewer::Fingerprint(fingerprint("10.0.0.1", "curl"));

        assert!(f.repo.record_view(f.destination_id, &anon, since).await.unwrap());
        assert!(!f.repo.record_view(f.destination_id, &anon, since).await.unwrap());
        assert!(f
            .repo
            .record_view(f.destination_id, &Viewer::User(f.alice), since)
            .await
            .unwrap());
        assert!(!f
            .repo
            .record_view(f.destination_id, &Viewer::User(f.alice), since)
            .await
            .unwrap());

        assert_eq!(counters(&f).await.0, 2);
    }

    #[tokio::test]
    async fn test_view_counted_again_after_window() {
        let f = setup().await;
        let viewer = Viewer::User(f.bob);
        f.repo
            .record_view(f.destination_id, &viewer, Utc::now() - Duration::hours(24))
            .await
            .unwrap();

        // A window starting in the future ignores the earlier view
        let counted = f
            .repo
            .record_view(f.destination_id, &viewer, Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert!(counted);
        assert_eq!(counters(&f).await.0, 2);
    }
}
