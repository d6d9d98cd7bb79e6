//! PostgreSQL connectivity for the workspace: pooled connections through
//! SeaORM, connect-with-retry for container startups, migrations and a
//! readiness probe.
//!
//! # Features
//!
//! - `postgres` (default): SeaORM connector, migrations runner, health check
//! - `config`: `core_config::FromEnv` for [`postgres::PostgresConfig`]
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_from_config_with_retry(PostgresConfig::from_env()?, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "accounts_api").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
