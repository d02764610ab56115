//! Case identifier newtype.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum case id length; matches the `records.case_id` column.
pub const CASE_ID_MAX: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaseIdValidationError {
    #[error("case id must not be empty")]
    Empty,
    #[error("case id must not contain whitespace")]
    Whitespace,
    #[error("case id must be at most {max} characters")]
    TooLong { max: usize },
}

/// Stable identifier of a case, e.g. `Case001`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "Case001")]
pub struct CaseId(String);

impl CaseId {
    pub fn new(value: impl Into<String>) -> Result<Self, CaseIdValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CaseIdValidationError::Empty);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(CaseIdValidationError::Whitespace);
        }
        if value.chars().count() > CASE_ID_MAX {
            return Err(CaseIdValidationError::TooLong { max: CASE_ID_MAX });
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for CaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CaseId> for String {
    fn from(value: CaseId) -> Self {
        value.0
    }
}

impl TryFrom<String> for CaseId {
    type Error = CaseIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
