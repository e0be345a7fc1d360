use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use rookery_shared::errors::AppResult;
use rookery_shared::types::api::ApiResponse;
use rookery_shared::types::pagination::{Paginated, PaginationParams};

use crate::auth::CurrentUser;
use crate::events::publisher;
use crate::services::like_service;
use crate::views::{LikeToggleView, UserSummary};
use crate::AppState;

// --- POST /posts/:id/like ---

pub async fn toggle_like(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeToggleView>>> {
    let view = like_service::toggle_like(&state.store, &user, post_id)?;

    if view.created {
        publisher::publish_post_liked(state.rabbitmq.as_ref(), post_id, user.id, view.post_author_id).await;
    }

    Ok(Json(ApiResponse::ok(view)))
}

// --- GET /posts/:id/likes ---

pub async fn list_likes(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<UserSummary>>>> {
    let page = like_service::list_likes(&state.store, post_id, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}
