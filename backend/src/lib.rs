//! Case annotation backend.
//!
//! Reviewers log in, work through a fixed catalogue of cases and record
//! per-item values, optionally in a second pass with reference answers
//! shown. The admin follows progress and moves the record table in and out
//! as CSV.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
