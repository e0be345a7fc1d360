//! Request extractors that tie a verified token to a live account.
//!
//! The shared [`AuthUser`] extractor only checks the signature and expiry.
//! These wrappers also look the caller up in the store, so a token for a
//! deleted account is rejected and role checks use the current role.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use rookery_shared::errors::{AppError, ErrorCode};
use rookery_shared::middleware::OptionalAuthUser;
use rookery_shared::types::auth::{AuthUser, Capability};

use crate::services::account_service;
use crate::AppState;

/// An authenticated caller whose account still exists.
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let claims = AuthUser::from_request_parts(parts, state).await?;
        account_service::resolve_caller(&state.store, claims).map(Self)
    }
}

/// Anonymous when no `Authorization` header is sent; otherwise a [`CurrentUser`].
pub struct OptionalCurrentUser(pub Option<AuthUser>);

impl OptionalCurrentUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.id)
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalCurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let OptionalAuthUser(claims) = OptionalAuthUser::from_request_parts(parts, state).await?;
        let caller = claims
            .map(|claims| account_service::resolve_caller(&state.store, claims))
            .transpose()?;
        Ok(Self(caller))
    }
}

/// A [`CurrentUser`] whose stored role carries `ManageUsers`.
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.can(Capability::ManageUsers) {
            return Err(AppError::new(ErrorCode::Forbidden, "admin access required"));
        }
        Ok(Self(user))
    }
}
