//! Database layer
//!
//! Listora runs on either backend:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected by configuration. Both drivers use `?` placeholders,
//! so repositories share their SQL text and only branch on the executor.
//!
//! # Usage
//!
//! ```ignore
//! use listora::config::DatabaseConfig;
//! use listora::db::{create_pool, migrations};
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
