//! PostgreSQL persistence for annotation records.
//!
//! The adapter here only translates between Diesel rows and domain records;
//! completion and gating rules live in the domain. Row structs (`models`)
//! and table definitions (`schema`) stay private to this module.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use casedesk::outbound::persistence::{DbPool, DieselRecordRepository, PoolConfig};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/casedesk")).await?;
//! let records = DieselRecordRepository::new(pool, Arc::new(mockable::DefaultClock));
//! # let _ = records;
//! # Ok(())
//! # }
//! ```

mod diesel_helpers;
mod diesel_record_repository;
pub mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_record_repository::DieselRecordRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
