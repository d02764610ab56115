//! CSV snapshot of the record table.
//!
//! Columns, in order: `username,case_id,ai,last_update,elapsed_time,data,completed`.
//! `last_update` is RFC 3339 in UTC, `data` is the stored payload as text and
//! booleans are `true`/`false`. Reading a written snapshot yields the same
//! records.

use std::io::{Read, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{CaseId, Record, RecordKey, Username, Variant};

/// Header row of every snapshot.
pub const SNAPSHOT_COLUMNS: [&str; 7] = [
    "username",
    "case_id",
    "ai",
    "last_update",
    "elapsed_time",
    "data",
    "completed",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid CSV: {message}")]
    Csv { message: String },
    #[error("snapshot header must be {expected}, found {found}")]
    Header { expected: String, found: String },
    #[error("snapshot row {row}: {message}")]
    InvalidRow { row: u64, message: String },
    #[error("payload of {key} is not UTF-8 text")]
    NonUtf8Payload { key: String },
}

impl From<csv::Error> for SnapshotError {
    fn from(err: csv::Error) -> Self {
        Self::Csv {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRow {
    username: String,
    case_id: String,
    ai: bool,
    last_update: String,
    elapsed_time: i64,
    data: String,
    completed: bool,
}

impl TryFrom<&Record> for SnapshotRow {
    type Error = SnapshotError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        let data = String::from_utf8(record.payload.clone()).map_err(|_| {
            SnapshotError::NonUtf8Payload {
                key: record.key.to_string(),
            }
        })?;
        Ok(Self {
            username: record.key.username.to_string(),
            case_id: record.key.case_id.to_string(),
            ai: record.key.variant.is_ai(),
            last_update: record
                .last_update
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            elapsed_time: record.elapsed_time,
            data,
            completed: record.completed,
        })
    }
}

impl SnapshotRow {
    fn into_record(self, row: u64) -> Result<Record, SnapshotError> {
        let invalid = |message: String| SnapshotError::InvalidRow { row, message };
        let username = Username::new(self.username).map_err(|err| invalid(err.to_string()))?;
        let case_id = CaseId::new(self.case_id).map_err(|err| invalid(err.to_string()))?;
        let last_update = DateTime::parse_from_rfc3339(&self.last_update)
            .map_err(|err| invalid(format!("last_update: {err}")))?
            .with_timezone(&Utc);
        if self.elapsed_time < 0 {
            return Err(invalid("elapsed_time must not be negative".to_owned()));
        }
        Ok(Record {
            key: RecordKey::new(username, case_id, Variant::from(self.ai)),
            payload: self.data.into_bytes(),
            elapsed_time: self.elapsed_time,
            completed: self.completed,
            last_update,
        })
    }
}

/// Write `records` as a snapshot, header included.
pub fn write_snapshot<W: Write>(records: &[Record], out: W) -> Result<(), SnapshotError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(SNAPSHOT_COLUMNS)?;
    for record in records {
        writer.serialize(SnapshotRow::try_from(record)?)?;
    }
    writer.flush().map_err(|err| SnapshotError::Csv {
        message: err.to_string(),
    })
}

/// Encode `records` into an in-memory snapshot.
pub fn snapshot_bytes(records: &[Record]) -> Result<Vec<u8>, SnapshotError> {
    let mut buffer = Vec::new();
    write_snapshot(records, &mut buffer)?;
    Ok(buffer)
}

/// Parse a snapshot. The header must match [`SNAPSHOT_COLUMNS`] exactly.
pub fn read_snapshot<R: Read>(input: R) -> Result<Vec<Record>, SnapshotError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let headers = reader.headers()?.clone();
    if !headers.iter().eq(SNAPSHOT_COLUMNS) {
        return Err(SnapshotError::Header {
            expected: SNAPSHOT_COLUMNS.join(","),
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<SnapshotRow>().enumerate() {
        // Row numbers are 1-based and count the header.
        let row_number = index as u64 + 2;
        let row = row.map_err(|err| SnapshotError::InvalidRow {
            row: row_number,
            message: err.to_string(),
        })?;
        records.push(row.into_record(row_number)?);
    }
    Ok(records)
}
