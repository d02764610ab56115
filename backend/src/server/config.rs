//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::cookie::{Key, SameSite};
use casedesk::domain::{AnnotationPolicy, CaseCatalogue};
use casedesk::outbound::persistence::DbPool;

/// Default upper bound for snapshot uploads.
pub const DEFAULT_PAYLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) catalogue: Arc<CaseCatalogue>,
    pub(crate) policy: AnnotationPolicy,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) payload_limit: usize,
}

impl ServerConfig {
    /// Construct a server configuration backed by the in-memory store.
    #[must_use]
    pub fn new(
        key: Key,
        cookie_secure: bool,
        same_site: SameSite,
        bind_addr: SocketAddr,
        catalogue: Arc<CaseCatalogue>,
    ) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            catalogue,
            policy: AnnotationPolicy::default(),
            db_pool: None,
            payload_limit: DEFAULT_PAYLOAD_LIMIT,
        }
    }

    /// Completion and gating rules applied to submissions.
    #[must_use]
    pub fn with_policy(mut self, policy: AnnotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach a database connection pool; records are then stored in
    /// PostgreSQL.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_support::tiny_catalogue;
    use casedesk::domain::{CompletionRule, PassGate};
    use rstest::rstest;

    #[rstest]
    fn defaults_use_single_pass_and_the_memory_store() {
        let addr: SocketAddr = "127.0.0.1:0".parse().expect("addr");
        let config = ServerConfig::new(
            Key::generate(),
            false,
            SameSite::Lax,
            addr,
            Arc::new(tiny_catalogue()),
        );
        assert_eq!(config.bind_addr(), addr);
        assert!(config.db_pool.is_none());
        assert!(!config.policy.two_pass());
        assert_eq!(config.payload_limit, DEFAULT_PAYLOAD_LIMIT);
    }

    #[rstest]
    fn policy_is_replaced() {
        let policy = AnnotationPolicy {
            completion_rule: CompletionRule::ExplicitFix,
            gate: Some(PassGate::new(chrono::Duration::minutes(5))),
        };
        let config = ServerConfig::new(
            Key::generate(),
            true,
            SameSite::Strict,
            "127.0.0.1:0".parse().expect("addr"),
            Arc::new(tiny_catalogue()),
        )
        .with_policy(policy);
        assert_eq!(config.policy, policy);
    }
}
