//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::test;
use serde_json::json;

use crate::domain::ports::CatalogueLoginService;
use crate::domain::test_support::{FixtureClock, fixture_clock, sample_catalogue};
use crate::domain::{AnnotationPolicy, AnnotationService};
use crate::outbound::memory::InMemoryRecordRepository;

use super::state::{HttpState, HttpStatePorts};

/// Session middleware with a fresh key and an insecure cookie for plain
/// HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// State over the sample catalogue and an in-memory store.
pub fn memory_state(policy: AnnotationPolicy) -> (HttpState, Arc<FixtureClock>) {
    let clock = fixture_clock();
    let catalogue = Arc::new(sample_catalogue());
    let service = Arc::new(AnnotationService::new(
        Arc::new(InMemoryRecordRepository::new(clock.clone())),
        catalogue.clone(),
        policy,
        clock.clone(),
    ));
    let state = HttpState::new(HttpStatePorts {
        login: Arc::new(CatalogueLoginService::new(catalogue.clone())),
        annotations: service.clone(),
        annotations_query: service,
    });
    (state, clock)
}

/// Log in as a sample catalogue user (password `<name>-pw`) and return the
/// session cookie.
pub async fn login_cookie<S, B>(app: &S, username: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let request = test::TestRequest::post()
        .uri("/api/v1/login")
        .set_json(json!({ "username": username, "password": format!("{username}-pw") }))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "login as {username} failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}
