//! Export or restore the record table as a CSV snapshot.
//!
//! ```text
//! records-snapshot export --out records.csv
//! records-snapshot import --database-url postgres://... records.csv
//! ```
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use casedesk::domain::ports::RecordRepository;
use casedesk::domain::snapshot::{read_snapshot, snapshot_bytes};
use casedesk::outbound::cap_fs::{read_file, write_file};
use casedesk::outbound::persistence::{
    DbPool, DieselRecordRepository, PoolConfig, run_pending_migrations,
};
use clap::{Parser, Subcommand};
use mockable::DefaultClock;
use tokio::runtime::Builder;

/// `records-snapshot` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "records-snapshot",
    about = "Export or import the annotation record table as CSV",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Write every record to a CSV file.
    Export {
        /// Destination file.
        #[arg(long = "out", value_name = "path")]
        out: PathBuf,
    },
    /// Upsert every row of a CSV file; rows not in the file are kept.
    Import {
        /// Snapshot file to read.
        #[arg(value_name = "path")]
        input: PathBuf,
    },
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let database_url = resolve_database_url(args.database_url)?;

    run_pending_migrations(&database_url)
        .await
        .map_err(|error| io::Error::other(format!("apply migrations: {error}")))?;
    let pool = DbPool::new(PoolConfig::new(&database_url))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
    let records = DieselRecordRepository::new(pool, Arc::new(DefaultClock));

    match args.command {
        Command::Export { out } => {
            let rows = records
                .export_all()
                .await
                .map_err(|error| io::Error::other(format!("read records: {error}")))?;
            let bytes = snapshot_bytes(&rows)
                .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
            write_file(&out, &bytes).map_err(|error| {
                io::Error::other(format!("write '{}': {error}", out.display()))
            })?;
            println!("exported={}", rows.len());
            println!("path={}", out.display());
        }
        Command::Import { input } => {
            let bytes = read_file(&input).map_err(|error| {
                io::Error::other(format!("read '{}': {error}", input.display()))
            })?;
            let rows = read_snapshot(bytes.as_slice())
                .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
            records
                .import_all(&rows)
                .await
                .map_err(|error| io::Error::other(format!("write records: {error}")))?;
            println!("imported={}", rows.len());
        }
    }
    Ok(())
}

fn resolve_database_url(explicit: Option<String>) -> io::Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "--database-url must not be empty when provided",
            ));
        }
        return Ok(value);
    }

    let from_env = env::var("DATABASE_URL").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "database URL missing: set --database-url or DATABASE_URL",
        )
    })?;
    if from_env.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "DATABASE_URL must not be empty",
        ));
    }
    Ok(from_env)
}
