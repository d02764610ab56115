//! Process-local record repository.
//!
//! Used when no database URL is configured and as the store behind the HTTP
//! flow tests. Contents are lost on restart.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::domain::ports::{RecordRepository, RecordRepositoryError};
use crate::domain::{Record, RecordKey, RecordWrite, Username, Variant};

/// In-memory [`RecordRepository`] keyed like the `records` table.
pub struct InMemoryRecordRepository {
    rows: Mutex<BTreeMap<RecordKey, Record>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRecordRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    fn rows(&self) -> MutexGuard<'_, BTreeMap<RecordKey, Record>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(rows: &mut BTreeMap<RecordKey, Record>, write: &RecordWrite, now: DateTime<Utc>) {
        let last_update = rows
            .get(&write.key)
            .map_or(now, |previous| previous.last_update.max(now));
        rows.insert(
            write.key.clone(),
            Record {
                key: write.key.clone(),
                payload: write.payload.clone(),
                elapsed_time: write.elapsed_time,
                completed: write.completed,
                last_update,
            },
        );
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, RecordRepositoryError> {
        Ok(self.rows().get(key).cloned())
    }

    async fn upsert(&self, write: &RecordWrite) -> Result<(), RecordRepositoryError> {
        let now = self.clock.utc();
        Self::apply(&mut self.rows(), write, now);
        Ok(())
    }

    async fn upsert_batch(&self, writes: &[RecordWrite]) -> Result<(), RecordRepositoryError> {
        let now = self.clock.utc();
        // One guard for the whole batch keeps it atomic for other callers.
        let mut rows = self.rows();
        for write in writes {
            Self::apply(&mut rows, write, now);
        }
        Ok(())
    }

    async fn count_completed(
        &self,
        username: &Username,
        variant: Variant,
    ) -> Result<usize, RecordRepositoryError> {
        Ok(self
            .rows()
            .values()
            .filter(|record| {
                record.completed
                    && record.key.variant == variant
                    && &record.key.username == username
            })
            .count())
    }

    async fn list_for_user(
        &self,
        username: &Username,
    ) -> Result<Vec<Record>, RecordRepositoryError> {
        Ok(self
            .rows()
            .values()
            .filter(|record| &record.key.username == username)
            .cloned()
            .collect())
    }

    async fn export_all(&self) -> Result<Vec<Record>, RecordRepositoryError> {
        Ok(self.rows().values().cloned().collect())
    }

    async fn import_all(&self, records: &[Record]) -> Result<(), RecordRepositoryError> {
        let mut rows = self.rows();
        for record in records {
            rows.insert(record.key.clone(), record.clone());
        }
        Ok(())
    }
}
