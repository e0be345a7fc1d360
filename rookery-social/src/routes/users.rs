use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use rookery_shared::errors::AppResult;
use rookery_shared::types::api::ApiResponse;
use rookery_shared::types::pagination::{Paginated, PaginationParams};

use crate::auth::{AdminUser, CurrentUser, OptionalCurrentUser};
use crate::events::publisher;
use crate::services::account_service::{self, SetRoleRequest};
use crate::services::follow_service;
use crate::views::{FollowView, ProfileView, UnfollowView, UserSummary};
use crate::AppState;

// --- GET /users/:id ---

pub async fn get_user(
    viewer: OptionalCurrentUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = account_service::public_profile(&state.store, user_id, viewer.id())?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- POST /users/:id/follow ---

pub async fn follow(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FollowView>>> {
    let view = follow_service::follow(&state.store, user.id, target_id)?;

    if view.created {
        publisher::publish_follow_created(state.rabbitmq.as_ref(), user.id, target_id).await;
    }

    Ok(Json(ApiResponse::ok(view)))
}

// --- POST /users/:id/unfollow ---

pub async fn unfollow(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UnfollowView>>> {
    let view = follow_service::unfollow(&state.store, user.id, target_id)?;

    if view.removed {
        publisher::publish_follow_removed(state.rabbitmq.as_ref(), user.id, target_id).await;
    }

    Ok(Json(ApiResponse::ok(view)))
}

// --- GET /users/:id/followers ---

pub async fn list_followers(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<UserSummary>>>> {
    let page = follow_service::followers(&state.store, user_id, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

// --- GET /users/:id/following ---

pub async fn list_following(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<UserSummary>>>> {
    let page = follow_service::following(&state.store, user_id, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

// --- PUT /users/:id/role ---

pub async fn set_role(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = account_service::set_role(&state.store, admin.id, user_id, req.role)?;
    Ok(Json(ApiResponse::ok(profile)))
}
