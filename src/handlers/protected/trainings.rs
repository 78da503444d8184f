// handlers/protected/trainings.rs - doctor-owned trainings
//
// POST /api/trainings, GET /api/trainings/mine, GET /api/trainings/bookings/received,
// GET/PATCH/DELETE /api/trainings/:id            DOCTOR, SUPER_ADMIN

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::{BookingView, Training, TrainingView};
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{created, respond, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::services::trainings::{BookingQuery, TrainingPatch, TrainingQuery, TrainingRequest};
use crate::services::Ack;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/trainings", post(create))
        .route("/api/trainings/mine", get(mine))
        .route("/api/trainings/bookings/received", get(bookings_received))
        .route("/api/trainings/:id", get(show).patch(update).delete(remove))
        .route_layer(from_fn_with_state(RoleGate::new(roles::DOCTOR_STAFF), require_roles))
}

pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(request): ApiJson<TrainingRequest>,
) -> ApiResult<Training> {
    created(state.services.trainings.create(&identity, request).await)
}

pub async fn mine(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<TrainingQuery>,
) -> ApiResult<Page<TrainingView>> {
    respond(state.services.trainings.mine(&identity, query).await)
}

pub async fn show(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<TrainingView> {
    respond(state.services.trainings.get(&identity, id).await)
}

pub async fn update(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<TrainingPatch>,
) -> ApiResult<Training> {
    respond(state.services.trainings.update(&identity, id, patch).await)
}

pub async fn remove(State(state): State<AppState>, identity: Identity, ApiPath(id): ApiPath<i64>) -> ApiResult<Ack> {
    respond(state.services.trainings.delete(&identity, id).await)
}

pub async fn bookings_received(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> ApiResult<Page<BookingView>> {
    respond(state.services.trainings.bookings_received(&identity, query).await)
}
