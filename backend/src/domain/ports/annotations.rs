//! Driving ports for case annotation.
//!
//! [`AnnotationCommand`] covers every write (submit, fix, snapshot import);
//! [`AnnotationQuery`] the read models behind the dashboard, the case page
//! and the admin overview.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::domain::{CaseId, DiagnosisItem, Error, ItemDefinition, Record, Username, Variant};

/// A submission or fix of one case by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub username: Username,
    /// Raw case identifier from the request path.
    pub case_id: String,
    pub variant: Variant,
    /// Submitted JSON object, `elapsed_time` included.
    pub body: Vec<u8>,
}

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubmitOutcome {
    /// Completion flag now stored for the record.
    pub completed: bool,
}

/// Who is looking at a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseAccess {
    /// The annotator working on their own record; pass gating applies.
    Annotate,
    /// The admin inspecting somebody's record.
    ReadOnly,
}

/// Request for one case page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseViewRequest {
    /// Owner of the record; validated against the catalogue.
    pub username: String,
    pub case_id: String,
    pub variant: Variant,
    pub access: CaseAccess,
}

/// Current state of one record, or the empty state when nothing is stored.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    #[schema(value_type = String)]
    pub username: Username,
    #[schema(value_type = String)]
    pub case_id: CaseId,
    pub variant: Variant,
    #[schema(value_type = Object)]
    pub values: Map<String, Value>,
    pub elapsed_time: i64,
    pub completed: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub read_only: bool,
    /// Reference answers, shown during the with-aid pass and to the admin.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub reference: Option<Map<String, Value>>,
    /// Sliders to render, in configured order.
    pub items: Vec<ItemDefinition>,
    /// Categorical questions shown alongside the sliders.
    pub diagnosis_items: Vec<DiagnosisItem>,
}

/// Request for a dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRequest {
    pub username: String,
    /// Ordering seed; `None` lists cases in canonical order.
    pub seed: Option<u64>,
}

/// One row of a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCase {
    #[schema(value_type = String)]
    pub case_id: CaseId,
    pub completed: bool,
    /// Present in two-pass mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_with_aid: Option<bool>,
}

/// A user's case list with completion marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[schema(value_type = String)]
    pub username: Username,
    pub cases: Vec<DashboardCase>,
    /// `done/total`, or `done_a/total, done_b/total` in two-pass mode.
    #[schema(example = "3/10")]
    pub progress: String,
}

/// One line of the admin overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[schema(value_type = String)]
    pub username: Username,
    #[schema(example = "3/10")]
    pub progress: String,
    /// Every configured pass is finished.
    pub completed: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnotationCommand: Send + Sync {
    /// Store a submission. Completion follows the configured rule.
    ///
    /// # Errors
    /// - `not_found` for unconfigured cases.
    /// - `invalid_request` for malformed payloads.
    /// - `forbidden` while the with-aid pass is gated.
    /// - `conflict` when the record is already completed.
    async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, Error>;

    /// Finalise a record; seeds the with-aid pass when fixing without aid.
    async fn fix(&self, request: SubmitRequest) -> Result<SubmitOutcome, Error>;

    /// Restore snapshot rows and return how many were written.
    async fn import_snapshot(&self, records: Vec<Record>) -> Result<usize, Error>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnotationQuery: Send + Sync {
    async fn case_view(&self, request: CaseViewRequest) -> Result<CaseView, Error>;

    async fn dashboard(&self, request: DashboardRequest) -> Result<Dashboard, Error>;

    /// Progress of every configured user except the admin.
    async fn users_overview(&self) -> Result<Vec<UserProgress>, Error>;

    /// Every record in snapshot order.
    async fn export_snapshot(&self) -> Result<Vec<Record>, Error>;
}
