use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use rookery_shared::errors::AppResult;
use rookery_shared::types::api::{ApiResponse, Created};
use rookery_shared::types::pagination::{Paginated, PaginationParams};

use crate::auth::{CurrentUser, OptionalCurrentUser};
use crate::events::publisher;
use crate::models::PostFilter;
use crate::services::follow_service;
use crate::services::post_service::{self, CreatePostRequest, UpdatePostRequest};
use crate::views::PostView;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<Uuid>,
}

impl From<PostListQuery> for PostFilter {
    fn from(q: PostListQuery) -> Self {
        Self {
            title: q.title.filter(|t| !t.is_empty()),
            content: q.content.filter(|c| !c.is_empty()),
            author_id: q.author,
            author_ids: None,
        }
    }
}

// --- GET /posts ---

pub async fn list_posts(
    viewer: OptionalCurrentUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
    Query(query): Query<PostListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<PostView>>>> {
    let filter = PostFilter::from(query);
    let page = post_service::list_posts(&state.store, &filter, &params, viewer.id())?;
    Ok(Json(ApiResponse::ok(page)))
}

// --- POST /posts ---

pub async fn create_post(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Created<PostView>> {
    let post = post_service::create_post(&state.store, &user, req)?;

    publisher::publish_post_created(state.rabbitmq.as_ref(), post.id, user.id, &post.title).await;

    Ok(Created::new(post))
}

// --- GET /posts/:id ---

pub async fn get_post(
    viewer: OptionalCurrentUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PostView>>> {
    let post = post_service::get_post(&state.store, post_id, viewer.id())?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- PATCH /posts/:id ---

pub async fn update_post(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Json<ApiResponse<PostView>>> {
    let post = post_service::update_post(&state.store, &user, post_id, req)?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- DELETE /posts/:id ---

pub async fn delete_post(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    post_service::delete_post(&state.store, &user, post_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- GET /feed ---

pub async fn feed(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<PostView>>>> {
    let page = follow_service::feed(&state.store, user.id, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}
