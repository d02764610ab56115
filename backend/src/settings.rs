//! Application settings loaded via OrthoConfig.
//!
//! Values come from `CASEDESK_*` environment variables, command-line flags
//! or a configuration file. Every field is optional and falls back to the
//! defaults below.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{AnnotationPolicy, CompletionRule, PassGate, Username, UsernameValidationError};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ADMIN: &str = "admin";
const DEFAULT_CATALOGUE: &str = "catalogue.json";

/// Runtime settings of the annotation server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CASEDESK")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<SocketAddr>,
    /// PostgreSQL URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Path of the JSON case catalogue.
    pub catalogue_path: Option<PathBuf>,
    /// Enable the second (with-aid) annotation pass.
    #[ortho_config(default = false)]
    pub two_pass: bool,
    /// Minimum seconds between completing the first pass of a case and
    /// starting its second pass.
    pub min_interval_secs: Option<u32>,
    /// When a submission counts as complete.
    pub completion_rule: Option<CompletionRule>,
    /// Name of the administrator account.
    pub admin_username: Option<String>,
}

impl AppSettings {
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)))
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn catalogue_path(&self) -> PathBuf {
        self.catalogue_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOGUE))
    }

    pub fn min_interval(&self) -> Duration {
        Duration::seconds(i64::from(self.min_interval_secs.unwrap_or(0)))
    }

    pub fn completion_rule(&self) -> CompletionRule {
        self.completion_rule.unwrap_or_default()
    }

    pub fn admin_username(&self) -> Result<Username, UsernameValidationError> {
        Username::new(self.admin_username.as_deref().unwrap_or(DEFAULT_ADMIN))
    }

    /// Annotation rules derived from these settings.
    pub fn policy(&self) -> AnnotationPolicy {
        AnnotationPolicy {
            completion_rule: self.completion_rule(),
            gate: self.two_pass.then(|| PassGate::new(self.min_interval())),
        }
    }
}
