//! Annotator-facing handlers: dashboard, case view, submit and fix.
//!
//! ```text
//! GET /api/v1/dashboard
//! GET /api/v1/cases/Case001?variant=with_aid
//! PUT /api/v1/cases/Case001 {"Item01":"42","elapsed_time":12}
//! PUT /api/v1/cases/Case001/fix?variant=without_aid
//! ```

use actix_web::{HttpResponse, get, put, web};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    CaseAccess, CaseView, CaseViewRequest, Dashboard, DashboardRequest, SubmitRequest,
};
use crate::domain::{CASE_NOT_FOUND_REASON, Error, ErrorCode, Variant};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// `?variant=` selector shared by case endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VariantQuery {
    /// Annotation pass; defaults to `without_aid`.
    pub variant: Option<Variant>,
}

impl VariantQuery {
    fn variant(&self) -> Variant {
        self.variant.unwrap_or_default()
    }
}

/// Outcome body of submit and fix.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WriteResult {
    Success,
    Failure { reason: String },
}

/// Unknown cases answer with a failure body; every other error passes through.
fn write_response(outcome: Result<(), Error>) -> ApiResult<HttpResponse> {
    match outcome {
        Ok(()) => Ok(HttpResponse::Ok().json(WriteResult::Success)),
        Err(err) if err.code() == ErrorCode::NotFound => {
            Ok(HttpResponse::NotFound().json(WriteResult::Failure {
                reason: CASE_NOT_FOUND_REASON.to_owned(),
            }))
        }
        Err(err) => Err(err),
    }
}

/// The annotator's case list in their per-login order.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Case list with progress", body = Dashboard),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Admin session", body = Error)
    ),
    tags = ["cases"],
    operation_id = "dashboard"
)]
#[get("/dashboard")]
pub async fn dashboard(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Dashboard>> {
    let username = state.require_annotator(&session).await?;
    let seed = state.seeds.seed_or_assign(&username);
    let dashboard = state
        .annotations_query
        .dashboard(DashboardRequest {
            username: username.to_string(),
            seed: Some(seed),
        })
        .await?;
    Ok(web::Json(dashboard))
}

/// Current state of the annotator's own record.
#[utoipa::path(
    get,
    path = "/api/v1/cases/{case_id}",
    params(("case_id" = String, Path, description = "Case identifier"), VariantQuery),
    responses(
        (status = 200, description = "Record state", body = CaseView),
        (status = 400, description = "Pass not enabled", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Admin session or gated pass", body = Error),
        (status = 404, description = "Unknown case", body = Error)
    ),
    tags = ["cases"],
    operation_id = "getCase"
)]
#[get("/cases/{case_id}")]
pub async fn get_case(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<VariantQuery>,
) -> ApiResult<web::Json<CaseView>> {
    let username = state.require_annotator(&session).await?;
    let view = state
        .annotations_query
        .case_view(CaseViewRequest {
            username: username.to_string(),
            case_id: path.into_inner(),
            variant: query.variant(),
            access: CaseAccess::Annotate,
        })
        .await?;
    Ok(web::Json(view))
}

/// Save a payload; completion follows the configured rule.
#[utoipa::path(
    put,
    path = "/api/v1/cases/{case_id}",
    params(("case_id" = String, Path, description = "Case identifier"), VariantQuery),
    request_body(content = Object, description = "Item id to value, plus `elapsed_time`"),
    responses(
        (status = 200, description = "Saved", body = WriteResult),
        (status = 400, description = "Malformed payload", body = Error),
        (status = 403, description = "Gated pass", body = Error),
        (status = 404, description = "Unknown case", body = WriteResult),
        (status = 409, description = "Record already completed", body = Error)
    ),
    tags = ["cases"],
    operation_id = "submitCase"
)]
#[put("/cases/{case_id}")]
pub async fn submit_case(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<VariantQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let username = state.require_annotator(&session).await?;
    let outcome = state
        .annotations
        .submit(SubmitRequest {
            username,
            case_id: path.into_inner(),
            variant: query.variant(),
            body: body.to_vec(),
        })
        .await
        .map(|outcome| debug!(completed = outcome.completed, "submit handled"));
    write_response(outcome)
}

/// Finalise a record regardless of how many items it holds.
#[utoipa::path(
    put,
    path = "/api/v1/cases/{case_id}/fix",
    params(("case_id" = String, Path, description = "Case identifier"), VariantQuery),
    request_body(content = Object, description = "Item id to value, plus `elapsed_time`"),
    responses(
        (status = 200, description = "Finalised", body = WriteResult),
        (status = 400, description = "Malformed payload", body = Error),
        (status = 403, description = "Gated pass", body = Error),
        (status = 404, description = "Unknown case", body = WriteResult),
        (status = 409, description = "Record already completed", body = Error)
    ),
    tags = ["cases"],
    operation_id = "fixCase"
)]
#[put("/cases/{case_id}/fix")]
pub async fn fix_case(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<VariantQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let username = state.require_annotator(&session).await?;
    let outcome = state
        .annotations
        .fix(SubmitRequest {
            username,
            case_id: path.into_inner(),
            variant: query.variant(),
            body: body.to_vec(),
        })
        .await
        .map(|_| ());
    write_response(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::cookie::Cookie;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::Duration;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::test_support::FixtureClock;
    use crate::domain::{AnnotationPolicy, CompletionRule, PassGate, Username};
    use crate::inbound::http::test_utils::{login_cookie, memory_state, test_session_middleware};
    use crate::inbound::http::users;

    async fn app_with(
        policy: AnnotationPolicy,
    ) -> (
        impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
        Arc<FixtureClock>,
    ) {
        let (state, clock) = memory_state(policy);
        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(state)).service(
                web::scope("/api/v1")
                    .wrap(test_session_middleware())
                    .service(users::login)
                    .service(dashboard)
                    .service(get_case)
                    .service(fix_case)
                    .service(submit_case),
            ),
        )
        .await;
        (app, clock)
    }

    fn two_pass_policy(min_interval: Duration) -> AnnotationPolicy {
        AnnotationPolicy {
            completion_rule: CompletionRule::PayloadSize,
            gate: Some(PassGate::new(min_interval)),
        }
    }

    async fn put(
        app: &impl Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
        cookie: &Cookie<'static>,
        uri: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let response = actix_test::call_service(
            app,
            actix_test::TestRequest::put()
                .uri(uri)
                .cookie(cookie.clone())
                .set_json(body)
                .to_request(),
        )
        .await;
        let status = response.status();
        (status, actix_test::read_body_json(response).await)
    }

    async fn get(
        app: &impl Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
        cookie: &Cookie<'static>,
        uri: &str,
    ) -> (StatusCode, Value) {
        let response = actix_test::call_service(
            app,
            actix_test::TestRequest::get()
                .uri(uri)
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        let status = response.status();
        (status, actix_test::read_body_json(response).await)
    }

    #[actix_web::test]
    async fn partial_then_full_submission_completes_the_case() {
        let (app, _clock) = app_with(AnnotationPolicy::default()).await;
        let cookie = login_cookie(&app, "user1").await;

        let (status, body) = put(
            &app,
            &cookie,
            "/api/v1/cases/Case001",
            json!({ "Item01": "42", "elapsed_time": 5 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": "success" }));

        let (_, view) = get(&app, &cookie, "/api/v1/cases/Case001").await;
        assert_eq!(view["completed"], false);
        assert_eq!(view["values"], json!({ "Item01": "42" }));
        assert_eq!(view["elapsedTime"], 5);

        put(
            &app,
            &cookie,
            "/api/v1/cases/Case001",
            json!({ "Item01": "42", "Item02": "7", "Item03": "90", "elapsed_time": 9 }),
        )
        .await;
        let (_, board) = get(&app, &cookie, "/api/v1/dashboard").await;
        assert_eq!(board["progress"], "1/3");
    }

    #[actix_web::test]
    async fn case_view_carries_the_form_definitions() {
        let (app, _clock) = app_with(AnnotationPolicy::default()).await;
        let cookie = login_cookie(&app, "user1").await;

        let (status, view) = get(&app, &cookie, "/api/v1/cases/Case002").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = view["items"]
            .as_array()
            .expect("items array")
            .iter()
            .filter_map(|item| item["id"].as_str())
            .collect();
        assert_eq!(ids, ["Item01", "Item02", "Item03"]);
        assert_eq!(view["items"][0]["left"], "absent");
        assert_eq!(view["items"][0]["right"], "marked");
        assert_eq!(
            view["diagnosisItems"],
            json!([{
                "id": "Diagnosis",
                "name": "Working diagnosis",
                "options": ["benign", "malignant"]
            }])
        );
    }

    #[actix_web::test]
    async fn sessions_for_users_missing_from_the_catalogue_are_logged_out() {
        let (state, _clock) = memory_state(AnnotationPolicy::default());
        let app = actix_test::init_service(
            App::new().app_data(web::Data::new(state)).service(
                web::scope("/api/v1")
                    .wrap(test_session_middleware())
                    .route(
                        "/impersonate",
                        web::post().to(|session: SessionContext| async move {
                            let ghost = Username::new("ghost").expect("valid username");
                            session.persist_user(&ghost)?;
                            Ok::<_, Error>(HttpResponse::NoContent().finish())
                        }),
                    )
                    .service(dashboard)
                    .service(submit_case),
            ),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/impersonate")
                .to_request(),
        )
        .await;
        let cookie = response
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie")
            .into_owned();

        let (status, body) = put(
            &app,
            &cookie,
            "/api/v1/cases/Case001",
            json!({ "Item01": "42", "elapsed_time": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "login required");

        let (status, _) = get(&app, &cookie, "/api/v1/dashboard").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn unknown_case_answers_with_a_failure_body() {
        let (app, _clock) = app_with(AnnotationPolicy::default()).await;
        let cookie = login_cookie(&app, "user1").await;

        let (status, body) = put(&app, &cookie, "/api/v1/cases/Case999", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "result": "failure", "reason": "case_id not found" })
        );
    }

    #[actix_web::test]
    async fn completed_records_reject_edits() {
        let (app, _clock) = app_with(AnnotationPolicy::default()).await;
        let cookie = login_cookie(&app, "user2").await;

        let (status, _) = put(&app, &cookie, "/api/v1/cases/Case002/fix", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = put(
            &app,
            &cookie,
            "/api/v1/cases/Case002",
            json!({ "Item01": "1" }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
    }

    #[actix_web::test]
    async fn second_pass_opens_after_fix_and_interval() {
        let (app, clock) = app_with(two_pass_policy(Duration::seconds(60))).await;
        let cookie = login_cookie(&app, "user1").await;

        let (status, body) = get(&app, &cookie, "/api/v1/cases/Case001?variant=with_aid").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["details"]["code"].is_string());

        put(
            &app,
            &cookie,
            "/api/v1/cases/Case001/fix",
            json!({ "Item01": "42", "elapsed_time": 3 }),
        )
        .await;
        let (status, _) = get(&app, &cookie, "/api/v1/cases/Case001?variant=with_aid").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        clock.advance(Duration::seconds(60));
        let (status, view) = get(&app, &cookie, "/api/v1/cases/Case001?variant=with_aid").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["values"], json!({ "Item01": "42" }));
        assert_eq!(view["elapsedTime"], 0);
        assert_eq!(view["completed"], false);
    }

    #[rstest]
    #[case("/api/v1/dashboard")]
    #[case("/api/v1/cases/Case001")]
    #[actix_web::test]
    async fn admin_cannot_open_annotator_pages(#[case] uri: &str) {
        let (app, _clock) = app_with(AnnotationPolicy::default()).await;
        let cookie = login_cookie(&app, "admin").await;

        let (status, body) = get(&app, &cookie, uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Invalid page for admin");
    }

    #[actix_web::test]
    async fn with_aid_is_rejected_in_single_pass_mode() {
        let (app, _clock) = app_with(AnnotationPolicy::default()).await;
        let cookie = login_cookie(&app, "user1").await;

        let (status, body) = put(
            &app,
            &cookie,
            "/api/v1/cases/Case001?variant=with_aid",
            json!({ "Item01": "1" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[actix_web::test]
    async fn dashboard_requires_login() {
        let (app, _clock) = app_with(AnnotationPolicy::default()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/dashboard")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
