// handlers/protected/forum.rs - parent forum and hospital moderation
//
// /api/parent/forum/*                            PARENT
// /api/hospital/forum/*                          DOCTOR, SUPER_ADMIN

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::{Category, ForumCounts, PostView, ReplyView};
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{created, respond, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::services::forum::{
    LikeOutcome, ModerationQuery, PostQuery, PostRequest, PriorityChange, ReplyQuery, ReplyRequest,
    ReplySide, StatusChange,
};
use crate::services::Ack;

pub fn routes() -> Router<AppState> {
    let parent = Router::new()
        .route("/api/parent/forum/categories", get(categories))
        .route("/api/parent/forum/posts", get(list_posts).post(create_post))
        .route("/api/parent/forum/posts/:id", get(view_post).delete(delete_own_post))
        .route(
            "/api/parent/forum/posts/:id/replies",
            get(replies).post(parent_reply),
        )
        .route("/api/parent/forum/posts/:id/like", post(toggle_like))
        .route("/api/parent/forum/replies/:id", delete(delete_parent_reply))
        .route_layer(from_fn_with_state(RoleGate::new(roles::PARENT), require_roles));

    let hospital = Router::new()
        .route("/api/hospital/forum/posts", get(moderation_list))
        .route("/api/hospital/forum/posts/:id", get(post_detail).delete(moderate_delete_post))
        .route(
            "/api/hospital/forum/posts/:id/replies",
            get(replies).post(hospital_reply),
        )
        .route("/api/hospital/forum/posts/:id/status", patch(set_status))
        .route("/api/hospital/forum/posts/:id/priority", patch(set_priority))
        .route("/api/hospital/forum/replies/:id", delete(delete_hospital_reply))
        .route("/api/hospital/forum/stats", get(stats))
        .route_layer(from_fn_with_state(RoleGate::new(roles::DOCTOR_STAFF), require_roles));

    parent.merge(hospital)
}

pub async fn categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    respond(state.services.forum.categories().await)
}

pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PostQuery>,
) -> ApiResult<Page<PostView>> {
    respond(state.services.forum.list_posts(query).await)
}

pub async fn create_post(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(request): ApiJson<PostRequest>,
) -> ApiResult<PostView> {
    created(state.services.forum.create_post(&identity, request).await)
}

/// Counts a view.
pub async fn view_post(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<PostView> {
    respond(state.services.forum.view_post(id).await)
}

pub async fn delete_own_post(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Ack> {
    respond(state.services.forum.delete_own_post(&identity, id).await)
}

/// Oldest first; shared by both sides.
pub async fn replies(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ReplyQuery>,
) -> ApiResult<Page<ReplyView>> {
    respond(state.services.forum.replies(id, query).await)
}

pub async fn parent_reply(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ReplyRequest>,
) -> ApiResult<ReplyView> {
    created(state.services.forum.reply(&identity, id, ReplySide::Parent, request).await)
}

pub async fn toggle_like(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<LikeOutcome> {
    respond(state.services.forum.toggle_like(&identity, id).await)
}

pub async fn delete_parent_reply(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Ack> {
    respond(state.services.forum.delete_reply(&identity, id, ReplySide::Parent).await)
}

pub async fn moderation_list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ModerationQuery>,
) -> ApiResult<Page<PostView>> {
    respond(state.services.forum.moderation_list(query).await)
}

pub async fn post_detail(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<PostView> {
    respond(state.services.forum.post(id).await)
}

pub async fn moderate_delete_post(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Ack> {
    respond(state.services.forum.moderate_delete_post(&identity, id).await)
}

/// `isOfficial` defaults to true on this side.
pub async fn hospital_reply(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ReplyRequest>,
) -> ApiResult<ReplyView> {
    created(state.services.forum.reply(&identity, id, ReplySide::Hospital, request).await)
}

pub async fn set_status(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<PostView> {
    respond(state.services.forum.set_status(&identity, id, change).await)
}

pub async fn set_priority(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<PriorityChange>,
) -> ApiResult<PostView> {
    respond(state.services.forum.set_priority(&identity, id, change).await)
}

pub async fn delete_hospital_reply(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Ack> {
    respond(state.services.forum.delete_reply(&identity, id, ReplySide::Hospital).await)
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<ForumCounts> {
    respond(state.services.forum.stats().await)
}
