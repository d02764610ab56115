//! Embedded PostgreSQL provisioning for the record store suites.
//!
//! - One cluster per test binary, shared through the library's handle.
//! - A template database per migration set; each test clones it.
//! - Table teardown simulates a broken schema.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use casedesk::domain::ports::RecordRepositoryError;
use casedesk::outbound::persistence::migrations::MIGRATIONS;
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::MigrationHarness;
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "casedesk_template";
const PROVISION_RETRIES: usize = 5;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// The process-wide embedded cluster, started on first use.
pub fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(error) if attempt >= PROVISION_RETRIES => return Err(format!("{error:?}")),
            Err(_) => {
                std::thread::sleep(RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn template_database_name() -> Result<String, RecordRepositoryError> {
    let hash = hash_directory(migrations_dir())
        .map_err(|err| RecordRepositoryError::query(format!("hash migrations: {err}")))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Create the migrated template once per cluster and return its name.
fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, RecordRepositoryError> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| RecordRepositoryError::query(format!("template check: {err:?}")))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| RecordRepositoryError::query(format!("create template: {err:?}")))?;
        let url = cluster.connection().database_url(&template_name);
        migrate_schema(&url)?;
    }
    Ok(template_name)
}

fn provision_once(
    cluster: &ClusterHandle,
    attempt: usize,
) -> Result<TemporaryDatabase, RecordRepositoryError> {
    let template_name = ensure_template_database(cluster)?;
    let db_name = format!("test_{}", Uuid::new_v4().simple());
    cluster
        .temporary_database_from_template(db_name.as_str(), template_name.as_str())
        .map_err(|error| {
            RecordRepositoryError::query(format!(
                "clone template: attempt {attempt}/{PROVISION_RETRIES}: {error:?}"
            ))
        })
}

/// A fresh database cloned from the migrated template; dropped with the
/// returned guard.
pub fn provision_template_database(
    cluster: &ClusterHandle,
) -> Result<TemporaryDatabase, RecordRepositoryError> {
    let mut last_error = None;
    for attempt in 1..=PROVISION_RETRIES {
        match provision_once(cluster, attempt) {
            Ok(database) => return Ok(database),
            Err(error) => last_error = Some(error),
        }
        if attempt < PROVISION_RETRIES {
            std::thread::sleep(RETRY_DELAY);
        }
    }
    Err(last_error
        .unwrap_or_else(|| RecordRepositoryError::query("clone template: exhausted retries")))
}

/// Apply the embedded migrations to `url`.
pub fn migrate_schema(url: &str) -> Result<(), RecordRepositoryError> {
    let mut conn = PgConnection::establish(url)
        .map_err(|err| RecordRepositoryError::connection(format!("{err:?}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| RecordRepositoryError::query(format!("migration: {err:?}")))?;
    Ok(())
}

/// Drop the `records` table to simulate schema loss.
pub fn drop_records_table(url: &str) -> Result<(), RecordRepositoryError> {
    let mut client = Client::connect(url, NoTls)
        .map_err(|err| RecordRepositoryError::connection(format_postgres_error(&err)))?;
    client
        .batch_execute("DROP TABLE IF EXISTS records;")
        .map_err(|err| RecordRepositoryError::query(format_postgres_error(&err)))?;
    Ok(())
}
