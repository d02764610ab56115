//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL record store through Diesel
//! - **memory**: process-local record store for database-less runs and tests
//! - **catalogue_file**: JSON case catalogue loaded at startup
//!
//! Adapters translate between domain types and storage representations and
//! contain no annotation rules.

pub mod cap_fs;
pub mod catalogue_file;
pub mod memory;
pub mod persistence;
