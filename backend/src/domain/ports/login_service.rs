//! Driving port for login/authentication use-cases.
//!
//! Inbound adapters authenticate credentials through this port without
//! knowing where the user list comes from.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{CaseCatalogue, Error, LoginCredentials, Role, Username};

/// A successfully authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: Username,
    pub role: Role,
}

/// Domain use-case port for authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the authenticated user.
    async fn authenticate(&self, credentials: &LoginCredentials)
    -> Result<AuthenticatedUser, Error>;

    /// Look up the user a session was issued for.
    ///
    /// `None` means the user is no longer configured and the session must be
    /// treated as logged out.
    async fn resolve(&self, username: &Username) -> Result<Option<AuthenticatedUser>, Error>;
}

/// Authenticates against the users listed in the case catalogue.
#[derive(Debug, Clone)]
pub struct CatalogueLoginService {
    catalogue: Arc<CaseCatalogue>,
}

impl CatalogueLoginService {
    pub fn new(catalogue: Arc<CaseCatalogue>) -> Self {
        Self { catalogue }
    }
}

#[async_trait]
impl LoginService for CatalogueLoginService {
    async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthenticatedUser, Error> {
        let requested = credentials.username();
        let username = self
            .catalogue
            .user(requested)
            .ok_or_else(|| Error::unauthorized(format!("User \"{requested}\" not found.")))?;
        match self
            .catalogue
            .password_matches(username, credentials.password())
        {
            Some(true) => Ok(AuthenticatedUser {
                role: Role::for_user(username, self.catalogue.admin()),
                username: username.clone(),
            }),
            _ => Err(Error::unauthorized(format!(
                "Invalid password for \"{requested}\"."
            ))),
        }
    }

    async fn resolve(&self, username: &Username) -> Result<Option<AuthenticatedUser>, Error> {
        Ok(self
            .catalogue
            .user(username.as_ref())
            .map(|configured| AuthenticatedUser {
                role: Role::for_user(configured, self.catalogue.admin()),
                username: configured.clone(),
            }))
    }
}
