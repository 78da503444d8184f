// handlers/protected/appointments.rs - parent bookings and the staff queue
//
// POST /api/parent/appointments, GET /api/parent/appointments/mine,
// PATCH /api/parent/appointments/:id/cancel      PARENT
// GET /api/admin/appointments,
// PATCH /api/admin/appointments/:id              SUPER_ADMIN, SCHOOL_ADMIN, DOCTOR

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::{Appointment, AppointmentView};
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{created, respond, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::services::appointments::{AppointmentQuery, AppointmentRequest, CancelRequest, StatusUpdate};
use crate::services::Created;

pub fn routes() -> Router<AppState> {
    let parent = Router::new()
        .route("/api/parent/appointments", post(create))
        .route("/api/parent/appointments/mine", get(mine))
        .route("/api/parent/appointments/:id/cancel", patch(cancel))
        .route_layer(from_fn_with_state(RoleGate::new(roles::PARENT), require_roles));

    let staff = Router::new()
        .route("/api/admin/appointments", get(queue))
        .route("/api/admin/appointments/:id", patch(update_status))
        .route_layer(from_fn_with_state(
            RoleGate::new(roles::APPOINTMENT_STAFF),
            require_roles,
        ));

    parent.merge(staff)
}

pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(request): ApiJson<AppointmentRequest>,
) -> ApiResult<Created> {
    created(state.services.appointments.create(&identity, request).await)
}

pub async fn mine(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<AppointmentQuery>,
) -> ApiResult<Page<AppointmentView>> {
    respond(state.services.appointments.mine(&identity, query).await)
}

/// Only pending appointments can be cancelled; the body is optional.
pub async fn cancel(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    body: Option<ApiJson<CancelRequest>>,
) -> ApiResult<Appointment> {
    let request = body.map(|ApiJson(r)| r).unwrap_or_default();
    respond(state.services.appointments.cancel(&identity, id, request).await)
}

/// Doctors see only the appointments assigned to them.
pub async fn queue(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<AppointmentQuery>,
) -> ApiResult<Page<AppointmentView>> {
    respond(state.services.appointments.list_for_staff(&identity, query).await)
}

pub async fn update_status(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<Appointment> {
    respond(state.services.appointments.update_status(&identity, id, update).await)
}
