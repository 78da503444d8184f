// handlers/protected/doctors.rs - doctor self-service and the parent-facing directory
//
// GET/PATCH /api/doctors/me/profile, POST /api/doctors/me/avatar,
// GET /api/doctors/me/stats                      DOCTOR, SUPER_ADMIN
// GET /api/parent/doctors                        PARENT

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::{DoctorProfile, DoctorSummary};
use crate::error::ApiError;
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{respond, ApiJson, ApiMultipart, ApiQuery, ApiResult};
use crate::services::doctors::{AvatarUpdated, DirectoryQuery, DoctorStats, ProfilePatch};
use crate::uploads::UploadKind;

pub fn routes() -> Router<AppState> {
    let own = Router::new()
        .route("/api/doctors/me/profile", get(profile).patch(update_profile))
        .route(
            "/api/doctors/me/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/doctors/me/stats", get(stats))
        .route_layer(from_fn_with_state(RoleGate::new(roles::DOCTOR_STAFF), require_roles));

    let directory = Router::new()
        .route("/api/parent/doctors", get(directory))
        .route_layer(from_fn_with_state(RoleGate::new(roles::PARENT), require_roles));

    own.merge(directory)
}

pub async fn profile(State(state): State<AppState>, identity: Identity) -> ApiResult<DoctorProfile> {
    respond(state.services.doctors.profile(&identity).await)
}

pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<DoctorProfile> {
    respond(state.services.doctors.update_profile(&identity, patch).await)
}

/// Multipart with a single `file` part: jpeg, png or webp.
pub async fn upload_avatar(
    State(state): State<AppState>,
    identity: Identity,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<AvatarUpdated> {
    let form = state
        .uploads
        .collect_form(multipart, UploadKind::Avatar, identity.id, "file", 1)
        .await?;
    let stored = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::field_error("file", "An image file is required"))?;
    respond(state.services.doctors.set_avatar(&identity, stored).await)
}

pub async fn stats(State(state): State<AppState>, identity: Identity) -> ApiResult<DoctorStats> {
    respond(state.services.doctors.stats(&identity).await)
}

pub async fn directory(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DirectoryQuery>,
) -> ApiResult<Page<DoctorSummary>> {
    respond(state.services.doctors.directory(query).await)
}
