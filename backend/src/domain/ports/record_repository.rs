//! Driven port for annotation record persistence.
//!
//! Adapters store one row per [`RecordKey`] and assign `last_update`
//! themselves. Payload bytes are opaque here.

use async_trait::async_trait;

use crate::domain::{Record, RecordKey, RecordWrite, Username, Variant};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by record repository adapters.
    pub enum RecordRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "record repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "record repository query failed: {message}",
    }
}

/// Keyed-upsert store of annotation records.
///
/// ## Write semantics
/// - `upsert` inserts with `last_update = now` or overwrites payload,
///   elapsed time and completion of the existing row, moving `last_update`
///   to `max(previous, now)`.
/// - `upsert_batch` applies every write or none.
/// - `import_all` writes snapshot rows verbatim, `last_update` included.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Exact-key lookup. Absent rows are `Ok(None)`.
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, RecordRepositoryError>;

    async fn upsert(&self, write: &RecordWrite) -> Result<(), RecordRepositoryError>;

    async fn upsert_batch(&self, writes: &[RecordWrite]) -> Result<(), RecordRepositoryError>;

    /// Number of completed records of `username` in `variant`.
    async fn count_completed(
        &self,
        username: &Username,
        variant: Variant,
    ) -> Result<usize, RecordRepositoryError>;

    /// Every record of `username`, both variants.
    async fn list_for_user(&self, username: &Username)
    -> Result<Vec<Record>, RecordRepositoryError>;

    /// Whole table ordered by `(username, case_id, variant)`.
    async fn export_all(&self) -> Result<Vec<Record>, RecordRepositoryError>;

    /// Restore snapshot rows in one transaction.
    async fn import_all(&self, records: &[Record]) -> Result<(), RecordRepositoryError>;
}
