//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only talk to domain ports,
//! so tests can swap in mocks or the in-memory store.

use std::sync::Arc;

use tracing::warn;

use crate::domain::ports::{AnnotationCommand, AnnotationQuery, AuthenticatedUser, LoginService};
use crate::domain::{CaseOrderSeeds, Error, Username};

use super::session::SessionContext;

/// Port implementations bundled for [`HttpState::new`].
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub annotations: Arc<dyn AnnotationCommand>,
    pub annotations_query: Arc<dyn AnnotationQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub annotations: Arc<dyn AnnotationCommand>,
    pub annotations_query: Arc<dyn AnnotationQuery>,
    /// Per-login case ordering seeds.
    pub seeds: Arc<CaseOrderSeeds>,
}

impl HttpState {
    /// Build the state with an empty seed registry.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use casedesk::domain::{AnnotationService, CaseCatalogue};
    /// # use casedesk::domain::ports::CatalogueLoginService;
    /// # use casedesk::inbound::http::state::{HttpState, HttpStatePorts};
    /// # use casedesk::outbound::memory::InMemoryRecordRepository;
    /// # fn example(service: Arc<AnnotationService<InMemoryRecordRepository>>, catalogue: Arc<CaseCatalogue>) {
    /// let state = HttpState::new(HttpStatePorts {
    ///     login: Arc::new(CatalogueLoginService::new(catalogue.clone())),
    ///     annotations: service.clone(),
    ///     annotations_query: service,
    /// });
    /// # let _ = state;
    /// # }
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            login,
            annotations,
            annotations_query,
        } = ports;
        Self {
            login,
            annotations,
            annotations_query,
            seeds: Arc::new(CaseOrderSeeds::new()),
        }
    }

    /// The configured user behind the session.
    ///
    /// A session naming a user that is no longer in the catalogue is cleared
    /// and answered with `401 login required`.
    pub async fn session_user(
        &self,
        session: &SessionContext,
    ) -> Result<AuthenticatedUser, Error> {
        let username = session.require_user()?;
        match self.login.resolve(&username).await? {
            Some(user) => Ok(user),
            None => {
                warn!(%username, "session names a user missing from the catalogue");
                self.seeds.forget(&username);
                session.clear();
                Err(Error::unauthorized("login required"))
            }
        }
    }

    /// The logged-in annotator; the admin gets `403 Invalid page for admin`.
    pub async fn require_annotator(&self, session: &SessionContext) -> Result<Username, Error> {
        let user = self.session_user(session).await?;
        if user.role.is_admin() {
            return Err(Error::forbidden("Invalid page for admin"));
        }
        Ok(user.username)
    }

    /// The logged-in admin; anybody else gets `403 Admin only page.`.
    pub async fn require_admin(&self, session: &SessionContext) -> Result<Username, Error> {
        let user = self.session_user(session).await?;
        if !user.role.is_admin() {
            return Err(Error::forbidden("Admin only page."));
        }
        Ok(user.username)
    }
}
