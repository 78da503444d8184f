// handlers/protected/growth.rs - children, growth profiles and health records
//
// /api/parent/growth/*                           PARENT

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, patch},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::{Child, HealthRecord};
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{created, respond, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::services::growth::{
    ChildPatch, ChildRequest, HealthRecordPatch, HealthRecordRequest, ProfilePatch, ProfileView, RecordQuery,
};
use crate::services::Ack;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/parent/growth/children", get(children).post(create_child))
        .route(
            "/api/parent/growth/children/:id",
            get(child).patch(update_child).delete(delete_child),
        )
        .route(
            "/api/parent/growth/children/:id/profile",
            get(profile).patch(update_profile),
        )
        .route(
            "/api/parent/growth/children/:id/health-records",
            get(health_records).post(create_health_record),
        )
        .route(
            "/api/parent/growth/health-records/:id",
            patch(update_health_record).delete(delete_health_record),
        )
        .route_layer(from_fn_with_state(RoleGate::new(roles::PARENT), require_roles))
}

pub async fn children(State(state): State<AppState>, identity: Identity) -> ApiResult<Vec<Child>> {
    respond(state.services.growth.children(&identity).await)
}

/// Also creates the child's empty growth profile.
pub async fn create_child(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(request): ApiJson<ChildRequest>,
) -> ApiResult<Child> {
    created(state.services.growth.create_child(&identity, request).await)
}

pub async fn child(State(state): State<AppState>, identity: Identity, ApiPath(id): ApiPath<i64>) -> ApiResult<Child> {
    respond(state.services.growth.child(&identity, id).await)
}

pub async fn update_child(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ChildPatch>,
) -> ApiResult<Child> {
    respond(state.services.growth.update_child(&identity, id, patch).await)
}

pub async fn delete_child(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Ack> {
    respond(state.services.growth.delete_child(&identity, id).await)
}

pub async fn profile(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ProfileView> {
    respond(state.services.growth.profile(&identity, id).await)
}

pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<ProfileView> {
    respond(state.services.growth.update_profile(&identity, id, patch).await)
}

pub async fn health_records(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RecordQuery>,
) -> ApiResult<Page<HealthRecord>> {
    respond(state.services.growth.health_records(&identity, id, query).await)
}

pub async fn create_health_record(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<HealthRecordRequest>,
) -> ApiResult<HealthRecord> {
    created(state.services.growth.create_health_record(&identity, id, request).await)
}

pub async fn update_health_record(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<HealthRecordPatch>,
) -> ApiResult<HealthRecord> {
    respond(state.services.growth.update_health_record(&identity, id, patch).await)
}

pub async fn delete_health_record(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Ack> {
    respond(state.services.growth.delete_health_record(&identity, id).await)
}
