//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod annotations;
mod login_service;
mod record_repository;

#[cfg(test)]
pub use annotations::{MockAnnotationCommand, MockAnnotationQuery};
pub use annotations::{
    AnnotationCommand, AnnotationQuery, CaseAccess, CaseView, CaseViewRequest, Dashboard,
    DashboardCase, DashboardRequest, SubmitOutcome, SubmitRequest, UserProgress,
};
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::{AuthenticatedUser, CatalogueLoginService, LoginService};
#[cfg(test)]
pub use record_repository::MockRecordRepository;
pub use record_repository::{RecordRepository, RecordRepositoryError};
