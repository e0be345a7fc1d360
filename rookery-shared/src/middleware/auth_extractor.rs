use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, JwtKeys};

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts
            .extensions
            .get::<JwtKeys>()
            .ok_or_else(|| AppError::internal("JWT keys are not installed on the router"))?;

        let token = extract_bearer_token(&parts.headers)?;
        let claims = keys.verify(token)?;

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authentication credentials were not provided"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

/// Optional auth extractor: anonymous when no `Authorization` header is sent.
///
/// A header that is present but invalid is still rejected.
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key("Authorization") {
            return Ok(Self(None));
        }
        AuthUser::from_request_parts(parts, state).await.map(|u| Self(Some(u)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::auth::UserRole;
    use axum::http::Request;
    use uuid::Uuid;

    fn parts_with(keys: Option<&JwtKeys>, auth: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(keys) = keys {
            parts.extensions.insert(keys.clone());
        }
        parts
    }

    #[tokio::test]
    async fn valid_bearer_token() {
        let keys = JwtKeys::new("test", 60);
        let id = Uuid::new_v4();
        let token = keys.issue(id, UserRole::Member).unwrap().access_token;

        let mut parts = parts_with(Some(&keys), Some(format!("Bearer {token}")));
        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, UserRole::Member);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let keys = JwtKeys::new("test", 60);
        let mut parts = parts_with(Some(&keys), None);
        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn wrong_scheme_is_unauthorized() {
        let keys = JwtKeys::new("test", 60);
        let mut parts = parts_with(Some(&keys), Some("Token abc".into()));
        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn optional_auth_allows_anonymous() {
        let keys = JwtKeys::new("test", 60);
        let mut parts = parts_with(Some(&keys), None);
        let user = OptionalAuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(user.0.is_none());
    }

    #[tokio::test]
    async fn optional_auth_rejects_garbage_token() {
        let keys = JwtKeys::new("test", 60);
        let mut parts = parts_with(Some(&keys), Some("Bearer not-a-jwt".into()));
        assert!(OptionalAuthUser::from_request_parts(&mut parts, &()).await.is_err());
    }
}
