//! PostgreSQL-backed [`RecordRepository`] using Diesel.
//!
//! Every upsert is a single `INSERT .. ON CONFLICT (username, case_id, ai)
//! DO UPDATE` statement, so concurrent writers to one identity never both
//! insert. `last_update` is moved with `GREATEST(previous, now)`.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::OptionalExtension;
use diesel::pg::upsert::excluded;
use diesel::prelude::*;
use diesel::sql_types::Timestamptz;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use mockable::Clock;

use crate::domain::ports::{RecordRepository, RecordRepositoryError};
use crate::domain::{Record, RecordKey, RecordWrite, Username, Variant};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{NewRecordRow, RecordRow};
use super::pool::DbPool;
use super::schema::records;

diesel::define_sql_function! {
    /// PostgreSQL `GREATEST` over two timestamps.
    fn greatest(a: Timestamptz, b: Timestamptz) -> Timestamptz;
}

/// Diesel implementation of the record store.
#[derive(Clone)]
pub struct DieselRecordRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselRecordRepository {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn to_records(rows: Vec<RecordRow>) -> Result<Vec<Record>, RecordRepositoryError> {
    rows.into_iter()
        .map(|row| Record::try_from(row).map_err(RecordRepositoryError::query))
        .collect()
}

async fn upsert_row(
    conn: &mut AsyncPgConnection,
    row: &NewRecordRow<'_>,
) -> QueryResult<usize> {
    diesel::insert_into(records::table)
        .values(row)
        .on_conflict((records::username, records::case_id, records::ai))
        .do_update()
        .set((
            records::data.eq(excluded(records::data)),
            records::elapsed_time.eq(excluded(records::elapsed_time)),
            records::completed.eq(excluded(records::completed)),
            records::last_update.eq(greatest(
                records::last_update,
                excluded(records::last_update),
            )),
        ))
        .execute(conn)
        .await
}

/// Snapshot restore: every column, `last_update` included, comes from the row.
async fn restore_row(
    conn: &mut AsyncPgConnection,
    row: &NewRecordRow<'_>,
) -> QueryResult<usize> {
    diesel::insert_into(records::table)
        .values(row)
        .on_conflict((records::username, records::case_id, records::ai))
        .do_update()
        .set((
            records::data.eq(excluded(records::data)),
            records::elapsed_time.eq(excluded(records::elapsed_time)),
            records::completed.eq(excluded(records::completed)),
            records::last_update.eq(excluded(records::last_update)),
        ))
        .execute(conn)
        .await
}

#[async_trait]
impl RecordRepository for DieselRecordRepository {
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = records::table
            .filter(records::username.eq(key.username.as_ref()))
            .filter(records::case_id.eq(key.case_id.as_ref()))
            .filter(records::ai.eq(key.variant.is_ai()))
            .select(RecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| Record::try_from(row).map_err(RecordRepositoryError::query))
            .transpose()
    }

    async fn upsert(&self, write: &RecordWrite) -> Result<(), RecordRepositoryError> {
        let row = NewRecordRow::from_write(write, self.clock.utc());
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        upsert_row(&mut conn, &row).await.map_err(map_diesel_error)?;
        Ok(())
    }

    async fn upsert_batch(&self, writes: &[RecordWrite]) -> Result<(), RecordRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let now = self.clock.utc();
        let rows: Vec<NewRecordRow<'_>> = writes
            .iter()
            .map(|write| NewRecordRow::from_write(write, now))
            .collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                for row in &rows {
                    upsert_row(conn, row).await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn count_completed(
        &self,
        username: &Username,
        variant: Variant,
    ) -> Result<usize, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = records::table
            .filter(records::username.eq(username.as_ref()))
            .filter(records::ai.eq(variant.is_ai()))
            .filter(records::completed.eq(true))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        usize::try_from(count).map_err(|err| RecordRepositoryError::query(err.to_string()))
    }

    async fn list_for_user(
        &self,
        username: &Username,
    ) -> Result<Vec<Record>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = records::table
            .filter(records::username.eq(username.as_ref()))
            .order((records::case_id.asc(), records::ai.asc()))
            .select(RecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_records(rows)
    }

    async fn export_all(&self) -> Result<Vec<Record>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = records::table
            .order((
                records::username.asc(),
                records::case_id.asc(),
                records::ai.asc(),
            ))
            .select(RecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_records(rows)
    }

    async fn import_all(&self, records: &[Record]) -> Result<(), RecordRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let rows: Vec<NewRecordRow<'_>> = records.iter().map(NewRecordRow::from_record).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                for row in &rows {
                    restore_row(conn, row).await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}
