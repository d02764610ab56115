//! Internal Diesel row structs for the `records` table.
//!
//! These never leave the persistence layer; conversions to and from the
//! domain [`Record`] live here.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{CaseId, Record, RecordKey, RecordWrite, Username, Variant};

use super::schema::records;

/// Row read from `records`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RecordRow {
    pub username: String,
    pub case_id: String,
    pub ai: bool,
    pub data: Vec<u8>,
    pub elapsed_time: i64,
    pub completed: bool,
    pub last_update: DateTime<Utc>,
}

impl TryFrom<RecordRow> for Record {
    type Error = String;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let username = Username::new(row.username)
            .map_err(|err| format!("stored username is invalid: {err}"))?;
        let case_id =
            CaseId::new(row.case_id).map_err(|err| format!("stored case id is invalid: {err}"))?;
        Ok(Self {
            key: RecordKey::new(username, case_id, Variant::from(row.ai)),
            payload: row.data,
            elapsed_time: row.elapsed_time,
            completed: row.completed,
            last_update: row.last_update,
        })
    }
}

/// Row written to `records`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = records)]
pub(crate) struct NewRecordRow<'a> {
    pub username: &'a str,
    pub case_id: &'a str,
    pub ai: bool,
    pub data: &'a [u8],
    pub elapsed_time: i64,
    pub completed: bool,
    pub last_update: DateTime<Utc>,
}

impl<'a> NewRecordRow<'a> {
    pub(crate) fn from_write(write: &'a RecordWrite, now: DateTime<Utc>) -> Self {
        Self {
            username: write.key.username.as_ref(),
            case_id: write.key.case_id.as_ref(),
            ai: write.key.variant.is_ai(),
            data: &write.payload,
            elapsed_time: write.elapsed_time,
            completed: write.completed,
            last_update: now,
        }
    }

    pub(crate) fn from_record(record: &'a Record) -> Self {
        Self {
            username: record.key.username.as_ref(),
            case_id: record.key.case_id.as_ref(),
            ai: record.key.variant.is_ai(),
            data: &record.payload,
            elapsed_time: record.elapsed_time,
            completed: record.completed,
            last_update: record.last_update,
        }
    }
}
