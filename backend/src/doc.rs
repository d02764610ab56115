//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every handler of the inbound HTTP layer together with
//! the request and response schemas they use, plus the session cookie
//! security scheme. Swagger UI serves it in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{CaseView, Dashboard, DashboardCase, UserProgress};
use crate::domain::{DiagnosisItem, Error, ErrorCode, ItemDefinition, Role, Variant};
use crate::inbound::http::admin::ImportSummary;
use crate::inbound::http::cases::WriteResult;
use crate::inbound::http::users::{CurrentUser, LoginRequest};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "casedesk API",
        description = "Case annotation: login, per-user case lists, record submission and admin snapshots."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::current_user,
        crate::inbound::http::cases::dashboard,
        crate::inbound::http::cases::get_case,
        crate::inbound::http::cases::submit_case,
        crate::inbound::http::cases::fix_case,
        crate::inbound::http::admin::list_users,
        crate::inbound::http::admin::user_dashboard,
        crate::inbound::http::admin::user_case,
        crate::inbound::http::admin::export_records,
        crate::inbound::http::admin::import_records,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Role,
        Variant,
        LoginRequest,
        CurrentUser,
        Dashboard,
        DashboardCase,
        CaseView,
        ItemDefinition,
        DiagnosisItem,
        UserProgress,
        WriteResult,
        ImportSummary,
    )),
    tags(
        (name = "users", description = "Login and session"),
        (name = "cases", description = "Annotating cases"),
        (name = "admin", description = "Progress overview and record snapshots"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
