use axum::http::Method;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use rookery_shared::errors::{AppError, AppResult, ErrorCode};
use rookery_shared::types::auth::AuthUser;
use rookery_shared::types::pagination::{PageRequest, Paginated, PaginationParams};

use super::post_service::find_post;
use super::{not_blank, notification_service, permissions, validate_request};
use crate::models::{Comment, NewComment, NotificationTarget, UpdateComment, Verb};
use crate::store::{SocialRepo, Store};
use crate::views::{self, CommentView};

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(custom = "not_blank")]
    pub content: String,
}

/// A comment that belongs to `post_id`; comments under other posts are not found here.
fn find_comment(repo: &mut dyn SocialRepo, post_id: Uuid, comment_id: Uuid) -> AppResult<Comment> {
    repo.find_comment(comment_id)?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| AppError::new(ErrorCode::CommentNotFound, "comment not found"))
}

/// Comment on a post and notify its author.
pub fn add_comment(store: &Store, actor: &AuthUser, post_id: Uuid, req: CommentRequest) -> AppResult<CommentView> {
    validate_request(&req)?;

    let view = store.transaction(|repo| {
        let post = find_post(repo, post_id)?;
        let comment = repo.insert_comment(&NewComment {
            post_id,
            author_id: actor.id,
            content: req.content,
        })?;
        notification_service::notify(
            repo,
            post.author_id,
            actor.id,
            Verb::Comment,
            Some(NotificationTarget::Comment(comment.id)),
        )?;
        views::comment_view(repo, comment)
    })?;

    tracing::info!(comment_id = %view.id, post_id = %post_id, author_id = %actor.id, "comment created");
    Ok(view)
}

/// Comments on a post, oldest first.
pub fn list_comments(store: &Store, post_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<CommentView>> {
    store.transaction(|repo| {
        find_post(repo, post_id)?;
        let (rows, total) = repo.list_comments(post_id, PageRequest::from(params))?;
        let items = views::comment_views(repo, rows)?;
        Ok(Paginated::new(items, total as u64, params))
    })
}

pub fn get_comment(store: &Store, post_id: Uuid, comment_id: Uuid) -> AppResult<CommentView> {
    store.transaction(|repo| {
        let comment = find_comment(repo, post_id, comment_id)?;
        views::comment_view(repo, comment)
    })
}

pub fn update_comment(
    store: &Store,
    actor: &AuthUser,
    post_id: Uuid,
    comment_id: Uuid,
    req: CommentRequest,
) -> AppResult<CommentView> {
    validate_request(&req)?;

    store.transaction(|repo| {
        let comment = find_comment(repo, post_id, comment_id)?;
        permissions::authorize(&Method::PATCH, Some(actor), comment.author_id)?;

        let comment = repo.update_comment(comment_id, &UpdateComment { content: Some(req.content) })?;
        tracing::info!(comment_id = %comment_id, "comment updated");
        views::comment_view(repo, comment)
    })
}

pub fn delete_comment(store: &Store, actor: &AuthUser, post_id: Uuid, comment_id: Uuid) -> AppResult<()> {
    store.transaction(|repo| {
        let comment = find_comment(repo, post_id, comment_id)?;
        permissions::authorize(&Method::DELETE, Some(actor), comment.author_id)?;

        repo.delete_notifications_for(&[NotificationTarget::Comment(comment_id)])?;
        repo.delete_comment(comment_id)?;
        Ok(())
    })?;

    tracing::info!(comment_id = %comment_id, actor_id = %actor.id, "comment deleted");
    Ok(())
}
