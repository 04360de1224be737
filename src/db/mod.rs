//! Database layer
//!
//! Works against SQLite (default, single file) or MySQL, selected by the
//! `database.driver` setting. Repositories reach the concrete pool through
//! [`DatabasePool::backend`] and keep one SQL string per statement, written
//! with `?` placeholders that both drivers accept.
//!
//! ```ignore
//! use tripnest::config::DatabaseConfig;
//! use tripnest::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
