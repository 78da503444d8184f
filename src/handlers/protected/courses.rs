// handlers/protected/courses.rs - the published expert course catalogue
//
// GET /api/client/expert-courses, GET /api/client/expert-courses/:id,
// GET /api/client/expert-courses/:id/stream      any authenticated identity
//
// The stream route is what media elements load, so it is usually called
// with `?token=` instead of a bearer header.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::from_fn_with_state,
    response::Response,
    routing::get,
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::Video;
use crate::error::ApiError;
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{respond, ApiPath, ApiQuery, ApiResult};
use crate::services::videos::VideoQuery;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/client/expert-courses", get(courses))
        .route("/api/client/expert-courses/:id", get(course_detail))
        .route("/api/client/expert-courses/:id/stream", get(stream))
        .route_layer(from_fn_with_state(RoleGate::new(roles::ANY), require_roles))
}

pub async fn courses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VideoQuery>,
) -> ApiResult<Page<Video>> {
    respond(state.services.videos.courses(query).await)
}

/// Counts a view.
pub async fn course_detail(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Video> {
    respond(state.services.videos.course_detail(&identity, id).await)
}

/// Range-aware file response; `Range` requests answer 206.
pub async fn stream(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = state.services.videos.stream_path(&identity, id).await?;
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    Ok(response.map(Body::new))
}
