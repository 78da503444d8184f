// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// `app::router` wraps this tier in `require_identity`, so every handler here
// can take `Identity`. Each group narrows access with its own `RoleGate`,
// which runs after the identity is resolved.

use axum::Router;

use crate::app::AppState;

pub mod appointments;
pub mod auth;
pub mod cases;
pub mod courses;
pub mod doctors;
pub mod experts;
pub mod forum;
pub mod growth;
pub mod trainings;
pub mod videos;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(doctors::routes())
        .merge(appointments::routes())
        .merge(trainings::routes())
        .merge(experts::routes())
        .merge(cases::routes())
        .merge(forum::routes())
        .merge(growth::routes())
        .merge(videos::routes())
        .merge(courses::routes())
}
