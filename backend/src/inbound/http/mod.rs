//! HTTP inbound adapter exposing REST endpoints.

pub mod admin;
pub mod cases;
pub mod error;
pub mod health;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` handler on a scope.
///
/// Callers wrap the scope with the session middleware:
///
/// ```rust,no_run
/// # use actix_web::{App, web};
/// # fn build(session: actix_session::SessionMiddleware<actix_session::storage::CookieSessionStore>) {
/// let app = App::new().service(
///     web::scope("/api/v1")
///         .wrap(session)
///         .configure(casedesk::inbound::http::configure_api),
/// );
/// # let _ = app;
/// # }
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(users::login)
        .service(users::logout)
        .service(users::current_user)
        .service(cases::dashboard)
        .service(cases::fix_case)
        .service(cases::get_case)
        .service(cases::submit_case)
        .service(admin::list_users)
        .service(admin::export_records)
        .service(admin::import_records)
        .service(admin::user_case)
        .service(admin::user_dashboard);
}
