// handlers/protected/cases.rs - case records with file uploads
//
// POST /api/cases, GET /api/cases/mine, GET/PATCH/DELETE /api/cases/:id,
// POST /api/cases/:id/files, DELETE /api/cases/:id/files/:file_id
//                                                DOCTOR, SUPER_ADMIN

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::CaseRecord;
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{created, respond, ApiJson, ApiMultipart, ApiPath, ApiQuery, ApiResult};
use crate::services::cases::{CasePatch, CaseQuery, MAX_FILES_PER_REQUEST};
use crate::services::Ack;
use crate::uploads::UploadKind;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/cases",
            post(create).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/cases/mine", get(mine))
        .route("/api/cases/:id", get(show).patch(update).delete(remove))
        .route(
            "/api/cases/:id/files",
            post(add_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/cases/:id/files/:file_id", delete(remove_file))
        .route_layer(from_fn_with_state(RoleGate::new(roles::DOCTOR_STAFF), require_roles))
}

/// Multipart: `title`, `description?`, `caseType?` and 1-10 `files` parts.
pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<CaseRecord> {
    let form = state
        .uploads
        .collect_form(multipart, UploadKind::CaseFile, identity.id, "files", MAX_FILES_PER_REQUEST)
        .await?;
    created(state.services.cases.create(&identity, form).await)
}

pub async fn mine(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<CaseQuery>,
) -> ApiResult<Page<CaseRecord>> {
    respond(state.services.cases.mine(&identity, query).await)
}

pub async fn show(State(state): State<AppState>, identity: Identity, ApiPath(id): ApiPath<i64>) -> ApiResult<CaseRecord> {
    respond(state.services.cases.get(&identity, id).await)
}

pub async fn update(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CasePatch>,
) -> ApiResult<CaseRecord> {
    respond(state.services.cases.update(&identity, id, patch).await)
}

pub async fn remove(State(state): State<AppState>, identity: Identity, ApiPath(id): ApiPath<i64>) -> ApiResult<Ack> {
    respond(state.services.cases.delete(&identity, id).await)
}

pub async fn add_files(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<CaseRecord> {
    let form = state
        .uploads
        .collect_form(multipart, UploadKind::CaseFile, identity.id, "files", MAX_FILES_PER_REQUEST)
        .await?;
    respond(state.services.cases.add_files(&identity, id, form).await)
}

pub async fn remove_file(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath((id, file_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Ack> {
    respond(state.services.cases.delete_file(&identity, id, file_id).await)
}
