//! Domain primitives, policies and services.
//!
//! Types here are transport agnostic. Inbound adapters translate requests
//! into the driving ports in [`ports`]; outbound adapters implement the
//! driven ones.

pub mod annotation_service;
pub mod auth;
pub mod case_order;
pub mod catalogue;
pub mod error;
pub mod ports;
pub mod progress;
pub mod record;
pub mod snapshot;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::annotation_service::{AnnotationPolicy, AnnotationService, CASE_NOT_FOUND_REASON};
pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::case_order::CaseOrderSeeds;
pub use self::catalogue::{
    CaseCatalogue, CaseId, CatalogueDraft, CatalogueValidationError, DiagnosisItem,
    ItemDefinition, UserAccountDraft,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::progress::{CompletionRule, GateDenial, PassGate, Progress, ProgressSummary};
pub use self::record::{
    AnnotationPayload, ELAPSED_TIME_FIELD, PayloadError, Record, RecordKey, RecordWrite, Variant,
};
pub use self::snapshot::SnapshotError;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{Role, Username, UsernameValidationError};
