//! Database layer
//!
//! Persistence for the blog: users, tags, posts, post/tag associations and
//! threaded comments. Both SQLite (default) and MySQL are supported; the
//! driver is selected from configuration.
//!
//! # Usage
//!
//! ```ignore
//! use ninja_blog::config::DatabaseConfig;
//! use ninja_blog::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision both drivers store
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
