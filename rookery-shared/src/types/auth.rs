use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};

/// What a role is allowed to do beyond acting on its own resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create posts, comments, likes and follow edges.
    Publish,
    /// Delete other users' posts and comments.
    ModerateContent,
    /// Administer accounts.
    ManageUsers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Member,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            UserRole::Member => &[Capability::Publish],
            UserRole::Moderator => &[Capability::Publish, Capability::ModerateContent],
            UserRole::Admin => &[
                Capability::Publish,
                Capability::ModerateContent,
                Capability::ManageUsers,
            ],
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Member => write!(f, "member"),
            UserRole::Moderator => write!(f, "moderator"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(UserRole::Member),
            "moderator" => Ok(UserRole::Moderator),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, role: UserRole, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            role,
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// The authenticated caller, resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
    pub token_id: Uuid,
}

impl AuthUser {
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            token_id: claims.jti,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// HS256 signing material plus the access token lifetime.
///
/// Installed on the router as a request extension so the auth extractors
/// can verify tokens without global state.
#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<JwtKeysInner>,
}

struct JwtKeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl: i64) -> Self {
        Self {
            inner: Arc::new(JwtKeysInner {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                access_ttl,
            }),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: UserRole) -> Result<AccessToken, AppError> {
        let claims = Claims::new(user_id, role, self.inner.access_ttl);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding)
            .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))?;

        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.inner.access_ttl,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &self.inner.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::new(ErrorCode::TokenExpired, "token has expired")
                }
                _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
            }
        })?;

        if token_data.claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(token_data.claims)
    }
}
