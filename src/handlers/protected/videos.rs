// handlers/protected/videos.rs - doctor video uploads
//
// POST /api/videos, GET /api/videos/mine, GET/PATCH/DELETE /api/videos/:id
//                                                DOCTOR, SUPER_ADMIN

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::Video;
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{created, respond, ApiJson, ApiMultipart, ApiPath, ApiQuery, ApiResult};
use crate::services::videos::{VideoPatch, VideoQuery};
use crate::services::Ack;
use crate::uploads::UploadKind;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/videos",
            post(upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/videos/mine", get(mine))
        .route("/api/videos/:id", get(show).patch(update).delete(remove))
        .route_layer(from_fn_with_state(RoleGate::new(roles::DOCTOR_STAFF), require_roles))
}

/// Multipart: one `file` part plus `title`, `description`, `category`,
/// repeated `tags` / `targetAudience`, and `difficulty`.
pub async fn upload(
    State(state): State<AppState>,
    identity: Identity,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<Video> {
    let form = state
        .uploads
        .collect_form(multipart, UploadKind::Video, identity.id, "file", 1)
        .await?;
    created(state.services.videos.upload(&identity, form).await)
}

pub async fn mine(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<VideoQuery>,
) -> ApiResult<Page<Video>> {
    respond(state.services.videos.mine(&identity, query).await)
}

pub async fn show(State(state): State<AppState>, identity: Identity, ApiPath(id): ApiPath<i64>) -> ApiResult<Video> {
    respond(state.services.videos.get(&identity, id).await)
}

pub async fn update(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<VideoPatch>,
) -> ApiResult<Video> {
    respond(state.services.videos.update(&identity, id, patch).await)
}

pub async fn remove(State(state): State<AppState>, identity: Identity, ApiPath(id): ApiPath<i64>) -> ApiResult<Ack> {
    respond(state.services.videos.delete(&identity, id).await)
}
