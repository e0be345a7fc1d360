use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use rookery_shared::errors::AppResult;
use rookery_shared::types::api::{ApiResponse, Created};
use rookery_shared::types::auth::JwtKeys;

use crate::auth::CurrentUser;
use crate::events::publisher;
use crate::services::account_service::{self, AuthPayload, LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::views::ProfileView;
use crate::AppState;

// --- POST /accounts/register ---

pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(keys): Extension<JwtKeys>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Created<AuthPayload>> {
    let (payload, user) = account_service::register(&state.store, &keys, req)?;

    publisher::publish_user_registered(state.rabbitmq.as_ref(), user.id, &user.username).await;

    Ok(Created::new(payload))
}

// --- POST /accounts/login ---

pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(keys): Extension<JwtKeys>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    let payload = account_service::login(&state.store, &keys, req)?;
    Ok(Json(ApiResponse::ok(payload)))
}

// --- GET /accounts/profile ---

pub async fn get_profile(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = account_service::get_profile(&state.store, user.id)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PATCH /accounts/profile ---

pub async fn update_profile(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileView>>> {
    let profile = account_service::update_profile(&state.store, user.id, req)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- DELETE /accounts/profile ---

pub async fn delete_account(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<StatusCode> {
    account_service::delete_account(&state.store, user.id)?;
    Ok(StatusCode::NO_CONTENT)
}
