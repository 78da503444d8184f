// handlers/elevated/doctors.rs - doctor verification
//
// POST /api/admin/doctors/:user_id/verify

use axum::{extract::State, routing::post, Router};

use crate::app::AppState;
use crate::database::models::DoctorProfile;
use crate::middleware::{respond, ApiJson, ApiPath, ApiResult};
use crate::services::admin::VerifyRequest;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/admin/doctors/:user_id/verify", post(verify))
}

pub async fn verify(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> ApiResult<DoctorProfile> {
    respond(state.services.admin.verify_doctor(user_id, request).await)
}
