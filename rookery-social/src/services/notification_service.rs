use uuid::Uuid;

use rookery_shared::errors::{AppError, AppResult, ErrorCode};
use rookery_shared::types::pagination::{PageRequest, Paginated, PaginationParams};

use crate::models::{NewNotification, Notification, NotificationTarget, Verb};
use crate::store::{SocialRepo, Store};
use crate::views::{self, NotificationView};

/// Record a notification inside the caller's transaction.
///
/// Acting on your own content notifies nobody.
pub fn notify(
    repo: &mut dyn SocialRepo,
    recipient_id: Uuid,
    actor_id: Uuid,
    verb: Verb,
    target: Option<NotificationTarget>,
) -> AppResult<Option<Notification>> {
    if recipient_id == actor_id {
        return Ok(None);
    }

    let notification = repo.insert_notification(&NewNotification {
        recipient_id,
        actor_id,
        verb,
        target,
    })?;

    tracing::debug!(
        notification_id = %notification.id,
        recipient_id = %recipient_id,
        verb = verb.as_str(),
        "notification created"
    );

    Ok(Some(notification))
}

/// List notifications for a user, newest first.
pub fn list_notifications(
    store: &Store,
    user_id: Uuid,
    unread_only: bool,
    params: &PaginationParams,
) -> AppResult<Paginated<NotificationView>> {
    store.transaction(|repo| {
        let (rows, total) = repo.list_notifications(user_id, unread_only, PageRequest::from(params))?;
        let items = views::notification_views(repo, rows)?;
        Ok(Paginated::new(items, total as u64, params))
    })
}

pub fn unread_count(store: &Store, user_id: Uuid) -> AppResult<i64> {
    store.transaction(|repo| repo.count_unread(user_id))
}

/// Mark a single notification as read (only if it belongs to the user).
pub fn mark_read(store: &Store, user_id: Uuid, notification_id: Uuid) -> AppResult<NotificationView> {
    store.transaction(|repo| {
        let notification = repo
            .mark_read(notification_id, user_id)?
            .ok_or_else(|| AppError::new(ErrorCode::NotificationNotFound, "notification not found"))?;
        views::notification_views(repo, vec![notification])?
            .pop()
            .ok_or_else(|| AppError::internal("notification view was not built"))
    })
}

/// Mark all unread notifications as read for a user.
pub fn mark_all_read(store: &Store, user_id: Uuid) -> AppResult<usize> {
    let updated = store.transaction(|repo| repo.mark_all_read(user_id))?;
    tracing::debug!(user_id = %user_id, updated, "notifications marked read");
    Ok(updated)
}
