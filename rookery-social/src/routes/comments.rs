use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use rookery_shared::errors::AppResult;
use rookery_shared::types::api::{ApiResponse, Created};
use rookery_shared::types::pagination::{Paginated, PaginationParams};

use crate::auth::CurrentUser;
use crate::events::publisher;
use crate::services::comment_service::{self, CommentRequest};
use crate::views::CommentView;
use crate::AppState;

// --- GET /posts/:id/comments ---

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<CommentView>>>> {
    let page = comment_service::list_comments(&state.store, post_id, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

// --- POST /posts/:id/comments ---

pub async fn add_comment(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Created<CommentView>> {
    let comment = comment_service::add_comment(&state.store, &user, post_id, req)?;

    publisher::publish_comment_created(
        state.rabbitmq.as_ref(),
        comment.id,
        post_id,
        user.id,
        &comment.content,
    )
    .await;

    Ok(Created::new(comment))
}

// --- GET /posts/:id/comments/:comment_id ---

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<CommentView>>> {
    let comment = comment_service::get_comment(&state.store, post_id, comment_id)?;
    Ok(Json(ApiResponse::ok(comment)))
}

// --- PATCH /posts/:id/comments/:comment_id ---

pub async fn update_comment(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Json<ApiResponse<CommentView>>> {
    let comment = comment_service::update_comment(&state.store, &user, post_id, comment_id, req)?;
    Ok(Json(ApiResponse::ok(comment)))
}

// --- DELETE /posts/:id/comments/:comment_id ---

pub async fn delete_comment(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    comment_service::delete_comment(&state.store, &user, post_id, comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
