use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use rookery_shared::errors::{AppError, AppResult, ErrorCode};
use rookery_shared::types::auth::{AuthUser, JwtKeys, UserRole};

use super::{not_blank, validate_request};
use crate::models::{NewUser, NotificationTarget, UpdateUser, User};
use crate::store::Store;
use crate::views::{self, ProfileView, UserSummary};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

/// Letters, digits and `@ . + - _`.
fn username_chars(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        let mut err = ValidationError::new("username_chars");
        err.message = Some("may contain only letters, numbers, and @/./+/-/_ characters".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150), custom = "username_chars")]
    pub username: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    pub password2: String,
    #[validate(length(min = 1, max = 150), custom = "not_blank")]
    pub first_name: String,
    #[validate(length(min = 1, max = 150), custom = "not_blank")]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub bio: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(url(message = "profile_picture must be a URL"))]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserSummary,
}

fn auth_payload(keys: &JwtKeys, user: &User) -> AppResult<AuthPayload> {
    let token = keys.issue(user.id, user.role())?;
    Ok(AuthPayload {
        token: token.access_token,
        token_type: token.token_type,
        expires_in: token.expires_in,
        user: UserSummary::from(user),
    })
}

fn user_not_found() -> AppError {
    AppError::new(ErrorCode::UserNotFound, "user not found")
}

/// Create an account and sign it in. Returns the new user alongside the token.
pub fn register(store: &Store, keys: &JwtKeys, req: RegisterRequest) -> AppResult<(AuthPayload, User)> {
    validate_request(&req)?;
    if req.password != req.password2 {
        return Err(AppError::with_details(
            ErrorCode::PasswordMismatch,
            "password fields didn't match",
            serde_json::json!({ "password": ["password fields didn't match"] }),
        ));
    }
    validate_password(&req.password)?;

    let new_user = NewUser {
        username: req.username,
        email: req.email.trim().to_string(),
        password_hash: hash_password(&req.password)?,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        bio: req.bio,
        role: UserRole::Member.to_string(),
    };
    let user = store.transaction(|repo| repo.insert_user(&new_user))?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((auth_payload(keys, &user)?, user))
}

pub fn login(store: &Store, keys: &JwtKeys, req: LoginRequest) -> AppResult<AuthPayload> {
    let invalid = || AppError::new(ErrorCode::InvalidCredentials, "unable to log in with provided credentials");

    let user = store
        .transaction(|repo| repo.find_user_by_username(&req.username))?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "user logged in");
    auth_payload(keys, &user)
}

/// Match verified token claims against the account they name.
///
/// Tokens outlive account deletion and role changes, so the caller's role is
/// always read from the stored row rather than the claim.
pub fn resolve_caller(store: &Store, claims: AuthUser) -> AppResult<AuthUser> {
    let user = store.transaction(|repo| repo.find_user(claims.id))?;
    match user {
        Some(user) => Ok(AuthUser { role: user.role(), ..claims }),
        None => {
            tracing::debug!(user_id = %claims.id, "token names a deleted account");
            Err(AppError::unauthorized("user account no longer exists"))
        }
    }
}

pub fn get_profile(store: &Store, user_id: Uuid) -> AppResult<ProfileView> {
    store.transaction(|repo| {
        let user = repo.find_user(user_id)?.ok_or_else(user_not_found)?;
        views::profile_view(repo, &user, Some(user_id))
    })
}

pub fn update_profile(store: &Store, user_id: Uuid, req: UpdateProfileRequest) -> AppResult<ProfileView> {
    validate_request(&req)?;

    let changes = UpdateUser {
        email: req.email.map(|e| e.trim().to_string()),
        first_name: req.first_name,
        last_name: req.last_name,
        bio: req.bio,
        profile_picture: req.profile_picture,
        role: None,
    };

    store.transaction(|repo| {
        if repo.find_user(user_id)?.is_none() {
            return Err(user_not_found());
        }
        let user = repo.update_user(user_id, &changes)?;
        tracing::info!(user_id = %user_id, "profile updated");
        views::profile_view(repo, &user, Some(user_id))
    })
}

/// Remove the account and everything it owns, including notifications that
/// point at its posts or comments.
pub fn delete_account(store: &Store, user_id: Uuid) -> AppResult<()> {
    store.transaction(|repo| {
        let post_ids = repo.post_ids_by_author(user_id)?;
        let comment_ids = repo.comment_ids_for_cleanup(&post_ids, Some(user_id))?;

        let targets: Vec<NotificationTarget> = post_ids
            .into_iter()
            .map(NotificationTarget::Post)
            .chain(comment_ids.into_iter().map(NotificationTarget::Comment))
            .collect();
        repo.delete_notifications_for(&targets)?;

        if !repo.delete_user(user_id)? {
            return Err(user_not_found());
        }
        Ok(())
    })?;

    tracing::info!(user_id = %user_id, "account deleted");
    Ok(())
}

pub fn public_profile(store: &Store, user_id: Uuid, viewer: Option<Uuid>) -> AppResult<ProfileView> {
    store.transaction(|repo| {
        let user = repo.find_user(user_id)?.ok_or_else(user_not_found)?;
        views::profile_view(repo, &user, viewer)
    })
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

/// Change another user's role. Callers are checked for `ManageUsers` by the route.
pub fn set_role(store: &Store, admin_id: Uuid, user_id: Uuid, role: UserRole) -> AppResult<ProfileView> {
    if admin_id == user_id {
        return Err(AppError::bad_request("you cannot change your own role"));
    }

    let changes = UpdateUser {
        role: Some(role.to_string()),
        ..Default::default()
    };
    store.transaction(|repo| {
        if repo.find_user(user_id)?.is_none() {
            return Err(user_not_found());
        }
        let user = repo.update_user(user_id, &changes)?;
        tracing::info!(admin_id = %admin_id, user_id = %user_id, role = %role, "role changed");
        views::profile_view(repo, &user, Some(admin_id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    fn register_request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hunter2hunter2".to_string(),
            password2: "hunter2hunter2".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            bio: String::new(),
        }
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct horse 1").unwrap();
        assert!(verify_password("correct horse 1", &hash).unwrap());
        assert!(!verify_password("wrong horse 1", &hash).unwrap());
    }

    #[test]
    fn weak_passwords_are_rejected() {
        for weak in ["short1", "nodigitshere", "1234567890"] {
            let err = validate_password(weak).unwrap_err();
            assert_eq!(err.code(), ErrorCode::PasswordTooWeak);
        }
        assert!(validate_password("letters4ever").is_ok());
    }

    #[test]
    fn username_charset() {
        assert!(username_chars("ada.l+ove_lace-1@x").is_ok());
        assert!(username_chars("ada lovelace").is_err());
        assert!(username_chars("ada/lovelace").is_err());
    }

    #[test]
    fn register_then_login() {
        let store = Store::memory();
        let keys = JwtKeys::new("test", 60);

        let (payload, user) = register(&store, &keys, register_request("ada")).unwrap();
        assert_eq!(payload.user.username, "ada");
        assert_eq!(keys.verify(&payload.token).unwrap().sub, user.id);
        assert_ne!(user.password_hash, "hunter2hunter2");
        assert_eq!(user.role(), UserRole::Member);

        let login_ok = login(
            &store,
            &keys,
            LoginRequest { username: "ada".into(), password: "hunter2hunter2".into() },
        )
        .unwrap();
        assert_eq!(login_ok.user.id, user.id);

        let err = login(
            &store,
            &keys,
            LoginRequest { username: "ada".into(), password: "nope".into() },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
    }

    #[test]
    fn register_rejects_mismatch_and_duplicates() {
        let store = Store::memory();
        let keys = JwtKeys::new("test", 60);

        let mut req = register_request("ada");
        req.password2 = "something-else1".into();
        assert_eq!(register(&store, &keys, req).unwrap_err().code(), ErrorCode::PasswordMismatch);

        register(&store, &keys, register_request("ada")).unwrap();
        let err = register(&store, &keys, register_request("ada")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UsernameTaken);
    }

    #[test]
    fn register_validates_fields() {
        let store = Store::memory();
        let keys = JwtKeys::new("test", 60);

        let mut req = register_request("ada");
        req.email = "not-an-email".into();
        req.bio = "x".repeat(501);
        let err = register(&store, &keys, req).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn callers_resolve_against_the_stored_account() {
        let store = Store::memory();
        let ada = test_support::user_with_role(&store, "ada", UserRole::Admin);
        let claims = AuthUser { id: ada.id, role: UserRole::Member, token_id: Uuid::new_v4() };

        let caller = resolve_caller(&store, claims.clone()).unwrap();
        assert_eq!(caller.role, UserRole::Admin);
        assert_eq!(caller.token_id, claims.token_id);

        delete_account(&store, ada.id).unwrap();
        let err = resolve_caller(&store, claims).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn profile_views_hide_email_from_others() {
        let store = Store::memory();
        let ada = test_support::user(&store, "ada");
        let bob = test_support::user(&store, "bob");

        let own = get_profile(&store, ada.id).unwrap();
        assert_eq!(own.email.as_deref(), Some("ada@example.com"));
        assert!(own.is_following.is_none());

        let public = public_profile(&store, ada.id, Some(bob.id)).unwrap();
        assert!(public.email.is_none());
        assert_eq!(public.is_following, Some(false));

        let anonymous = public_profile(&store, ada.id, None).unwrap();
        assert!(anonymous.is_following.is_none());
    }

    #[test]
    fn update_profile_partial() {
        let store = Store::memory();
        let ada = test_support::user(&store, "ada");

        let updated = update_profile(
            &store,
            ada.id,
            UpdateProfileRequest { bio: Some("mathematician".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(updated.bio, "mathematician");
        assert_eq!(updated.first_name, "ada");

        let err = update_profile(
            &store,
            ada.id,
            UpdateProfileRequest { profile_picture: Some("not a url".into()), ..Default::default() },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn admins_change_roles() {
        let store = Store::memory();
        let admin = test_support::user_with_role(&store, "root", UserRole::Admin);
        let ada = test_support::user(&store, "ada");

        let view = set_role(&store, admin.id, ada.id, UserRole::Moderator).unwrap();
        assert_eq!(view.role, UserRole::Moderator);

        let err = set_role(&store, admin.id, admin.id, UserRole::Member).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
        let err = set_role(&store, admin.id, Uuid::new_v4(), UserRole::Member).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserNotFound);
    }

    #[test]
    fn delete_account_removes_user() {
        let store = Store::memory();
        let ada = test_support::user(&store, "ada");

        delete_account(&store, ada.id).unwrap();
        assert_eq!(get_profile(&store, ada.id).unwrap_err().code(), ErrorCode::UserNotFound);
        assert_eq!(delete_account(&store, ada.id).unwrap_err().code(), ErrorCode::UserNotFound);
    }
}
