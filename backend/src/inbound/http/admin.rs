//! Admin-only handlers: progress overview, read-only record views and the
//! CSV snapshot of the record table.

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::domain::ports::{
    CaseAccess, CaseView, CaseViewRequest, Dashboard, DashboardRequest, UserProgress,
};
use crate::domain::snapshot::{read_snapshot, snapshot_bytes};
use crate::domain::{Error, SnapshotError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cases::VariantQuery;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

const SNAPSHOT_FILENAME: &str = "records.csv";

/// Result of a snapshot import.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportSummary {
    /// Rows written to the store.
    pub imported: usize,
}

fn map_snapshot_error(err: SnapshotError) -> Error {
    let error = Error::invalid_request(err.to_string());
    match err {
        SnapshotError::InvalidRow { row, .. } => error.with_details(json!({ "row": row })),
        _ => error,
    }
}

/// Progress of every annotator.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "Per-user progress", body = [UserProgress]),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Admin only", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listUserProgress"
)]
#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<UserProgress>>> {
    state.require_admin(&session).await?;
    let overview = state.annotations_query.users_overview().await?;
    Ok(web::Json(overview))
}

/// A user's dashboard in canonical case order.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{username}",
    params(("username" = String, Path, description = "Annotator username")),
    responses(
        (status = 200, description = "Dashboard", body = Dashboard),
        (status = 403, description = "Admin only", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["admin"],
    operation_id = "userDashboard"
)]
#[get("/admin/users/{username}")]
pub async fn user_dashboard(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Dashboard>> {
    state.require_admin(&session).await?;
    let dashboard = state
        .annotations_query
        .dashboard(DashboardRequest {
            username: path.into_inner(),
            seed: None,
        })
        .await?;
    Ok(web::Json(dashboard))
}

/// Read-only view of somebody's record, reference answers included.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{username}/cases/{case_id}",
    params(
        ("username" = String, Path, description = "Annotator username"),
        ("case_id" = String, Path, description = "Case identifier"),
        VariantQuery
    ),
    responses(
        (status = 200, description = "Record state", body = CaseView),
        (status = 403, description = "Admin only", body = Error),
        (status = 404, description = "Unknown user or case", body = Error)
    ),
    tags = ["admin"],
    operation_id = "userCase"
)]
#[get("/admin/users/{username}/cases/{case_id}")]
pub async fn user_case(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
    query: web::Query<VariantQuery>,
) -> ApiResult<web::Json<CaseView>> {
    state.require_admin(&session).await?;
    let (username, case_id) = path.into_inner();
    let view = state
        .annotations_query
        .case_view(CaseViewRequest {
            username,
            case_id,
            variant: query.variant.unwrap_or_default(),
            access: CaseAccess::ReadOnly,
        })
        .await?;
    Ok(web::Json(view))
}

/// Download every record as CSV.
#[utoipa::path(
    get,
    path = "/api/v1/admin/records.csv",
    responses(
        (status = 200, description = "Snapshot", content_type = "text/csv", body = String),
        (status = 403, description = "Admin only", body = Error)
    ),
    tags = ["admin"],
    operation_id = "exportRecords"
)]
#[get("/admin/records.csv")]
pub async fn export_records(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    state.require_admin(&session).await?;
    let records = state.annotations_query.export_snapshot().await?;
    let body = snapshot_bytes(&records).map_err(|err| {
        warn!(error = %err, "snapshot export failed");
        Error::internal(err.to_string())
    })?;
    info!(rows = records.len(), "snapshot exported");
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(SNAPSHOT_FILENAME.to_owned())],
        })
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(body))
}

/// Restore records from a CSV snapshot. Existing identities are overwritten.
#[utoipa::path(
    post,
    path = "/api/v1/admin/records.csv",
    request_body(content = String, content_type = "text/csv", description = "Snapshot CSV"),
    responses(
        (status = 200, description = "Rows imported", body = ImportSummary),
        (status = 400, description = "Malformed snapshot", body = Error),
        (status = 403, description = "Admin only", body = Error)
    ),
    tags = ["admin"],
    operation_id = "importRecords"
)]
#[post("/admin/records.csv")]
pub async fn import_records(
    state: web::Data<HttpState>,
    session: SessionContext,
    body: web::Bytes,
) -> ApiResult<web::Json<ImportSummary>> {
    state.require_admin(&session).await?;
    let records = read_snapshot(body.as_ref()).map_err(map_snapshot_error)?;
    let imported = state.annotations.import_snapshot(records).await?;
    Ok(web::Json(ImportSummary { imported }))
}
