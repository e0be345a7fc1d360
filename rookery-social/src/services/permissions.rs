use axum::http::Method;
use uuid::Uuid;

use rookery_shared::errors::{AppError, AppResult};
use rookery_shared::types::auth::{AuthUser, Capability};

pub fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Object-level check shared by posts and comments.
///
/// Reads are open to everyone. Writes need an authenticated caller who owns the
/// resource; moderators may also delete content they do not own.
pub fn authorize(method: &Method, actor: Option<&AuthUser>, owner_id: Uuid) -> AppResult<()> {
    if is_safe(method) {
        return Ok(());
    }

    let actor = actor.ok_or_else(|| AppError::unauthorized("authentication credentials were not provided"))?;
    if actor.id == owner_id {
        return Ok(());
    }
    if *method == Method::DELETE && actor.can(Capability::ModerateContent) {
        tracing::info!(actor_id = %actor.id, owner_id = %owner_id, "moderator delete");
        return Ok(());
    }

    Err(AppError::forbidden("you do not have permission to perform this action"))
}
