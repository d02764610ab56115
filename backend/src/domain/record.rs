//! Annotation records and submitted payloads.
//!
//! A [`Record`] is the persisted state of one `(user, case, variant)` triple.
//! The store treats its payload as opaque bytes; [`AnnotationPayload`] is the
//! only place that parses them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::catalogue::CaseId;
use super::user::Username;

/// Submission field carrying the client-measured annotation time.
pub const ELAPSED_TIME_FIELD: &str = "elapsed_time";

/// Which annotation pass a record belongs to.
///
/// Persisted as the boolean `ai` column: `false` for the pass without aid.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    WithoutAid,
    WithAid,
}

impl Variant {
    /// Column value of the variant.
    #[must_use]
    pub fn is_ai(self) -> bool {
        matches!(self, Self::WithAid)
    }
}

impl From<bool> for Variant {
    fn from(ai: bool) -> Self {
        if ai { Self::WithAid } else { Self::WithoutAid }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithoutAid => f.write_str("without_aid"),
            Self::WithAid => f.write_str("with_aid"),
        }
    }
}

/// Identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub username: Username,
    pub case_id: CaseId,
    pub variant: Variant,
}

impl RecordKey {
    pub fn new(username: Username, case_id: CaseId, variant: Variant) -> Self {
        Self {
            username,
            case_id,
            variant,
        }
    }

    /// The same user and case in another pass.
    #[must_use]
    pub fn with_variant(&self, variant: Variant) -> Self {
        Self {
            variant,
            ..self.clone()
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.username, self.case_id, self.variant)
    }
}

/// Persisted annotation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: RecordKey,
    pub payload: Vec<u8>,
    pub elapsed_time: i64,
    pub completed: bool,
    pub last_update: DateTime<Utc>,
}

/// Values written by an upsert. The store assigns `last_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    pub key: RecordKey,
    pub payload: Vec<u8>,
    pub elapsed_time: i64,
    pub completed: bool,
}

/// Reasons a submitted or stored payload cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {message}")]
    InvalidJson { message: String },
    #[error("payload must be a JSON object")]
    NotObject,
    #[error("elapsed_time must be a non-negative integer number of seconds")]
    InvalidElapsedTime,
}

/// A parsed submission: item values plus the elapsed time.
///
/// Duplicate keys in the submitted JSON collapse to the last occurrence.
///
/// # Examples
/// ```
/// use casedesk::domain::AnnotationPayload;
///
/// let payload = AnnotationPayload::parse(br#"{"Item01":"42","elapsed_time":17}"#)
///     .expect("valid payload");
/// assert_eq!(payload.item_count(), 1);
/// assert_eq!(payload.elapsed_time(), 17);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationPayload {
    values: Map<String, Value>,
    elapsed_time: i64,
}

impl AnnotationPayload {
    /// Parse a submission body.
    ///
    /// A missing `elapsed_time` counts as zero.
    pub fn parse(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(body).map_err(|err| PayloadError::InvalidJson {
            message: err.to_string(),
        })?;
        let Value::Object(mut values) = value else {
            return Err(PayloadError::NotObject);
        };
        let elapsed_time = match values.remove(ELAPSED_TIME_FIELD) {
            None | Some(Value::Null) => 0,
            Some(raw) => parse_elapsed_time(&raw)?,
        };
        Ok(Self {
            values,
            elapsed_time,
        })
    }

    /// Decode the item values of a stored record.
    pub fn decode_stored(bytes: &[u8]) -> Result<Map<String, Value>, PayloadError> {
        match serde_json::from_slice(bytes) {
            Ok(Value::Object(values)) => Ok(values),
            Ok(_) => Err(PayloadError::NotObject),
            Err(err) => Err(PayloadError::InvalidJson {
                message: err.to_string(),
            }),
        }
    }

    /// Number of item entries, foreign keys included.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn elapsed_time(&self) -> i64 {
        self.elapsed_time
    }

    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Bytes stored in the record table.
    #[must_use]
    pub fn to_stored_bytes(&self) -> Vec<u8> {
        Value::Object(self.values.clone()).to_string().into_bytes()
    }
}

fn parse_elapsed_time(raw: &Value) -> Result<i64, PayloadError> {
    let seconds = match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    seconds
        .filter(|value| *value >= 0)
        .ok_or(PayloadError::InvalidElapsedTime)
}
