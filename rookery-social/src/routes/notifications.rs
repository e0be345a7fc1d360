use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rookery_shared::errors::AppResult;
use rookery_shared::types::api::ApiResponse;
use rookery_shared::types::pagination::{Paginated, PaginationParams};

use crate::auth::CurrentUser;
use crate::services::notification_service;
use crate::views::NotificationView;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

/// GET /notifications
/// List notifications for the authenticated user, optionally unread only.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth_user): CurrentUser,
    Query(params): Query<PaginationParams>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<ApiResponse<Paginated<NotificationView>>>> {
    let page = notification_service::list_notifications(&state.store, auth_user.id, query.unread, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth_user): CurrentUser,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let count = notification_service::unread_count(&state.store, auth_user.id)?;

    Ok(Json(ApiResponse::ok(UnreadCountResponse { count })))
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// POST /notifications/mark-all-read
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth_user): CurrentUser,
) -> AppResult<Json<ApiResponse<MarkAllReadResponse>>> {
    let updated = notification_service::mark_all_read(&state.store, auth_user.id)?;

    Ok(Json(ApiResponse::ok(MarkAllReadResponse { updated })))
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// POST /notifications/:id/mark-read
/// Another user's notification is reported as not found.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<NotificationView>>> {
    let notification = notification_service::mark_read(&state.store, auth_user.id, id)?;

    Ok(Json(ApiResponse::ok(notification)))
}
