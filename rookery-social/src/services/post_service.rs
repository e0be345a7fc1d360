use axum::http::Method;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use rookery_shared::errors::{AppError, AppResult, ErrorCode};
use rookery_shared::types::auth::{AuthUser, Capability};
use rookery_shared::types::pagination::{PageRequest, Paginated, PaginationParams};

use super::{not_blank, permissions, validate_request};
use crate::models::{NewPost, NotificationTarget, Post, PostFilter, UpdatePost};
use crate::store::{SocialRepo, Store};
use crate::views::{self, PostView};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub title: String,
    #[validate(custom = "not_blank")]
    pub content: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub title: Option<String>,
    #[validate(custom = "not_blank")]
    pub content: Option<String>,
}

pub(crate) fn find_post(repo: &mut dyn SocialRepo, post_id: Uuid) -> AppResult<Post> {
    repo.find_post(post_id)?
        .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))
}

pub fn create_post(store: &Store, actor: &AuthUser, req: CreatePostRequest) -> AppResult<PostView> {
    validate_request(&req)?;
    if !actor.can(Capability::Publish) {
        return Err(AppError::forbidden("your role cannot publish posts"));
    }

    let new_post = NewPost {
        author_id: actor.id,
        title: req.title.trim().to_string(),
        content: req.content,
    };
    let view = store.transaction(|repo| {
        let post = repo.insert_post(&new_post)?;
        views::post_view(repo, post, Some(actor.id), false)
    })?;

    tracing::info!(post_id = %view.id, author_id = %actor.id, "post created");
    Ok(view)
}

/// A single post with its comment thread.
pub fn get_post(store: &Store, post_id: Uuid, viewer: Option<Uuid>) -> AppResult<PostView> {
    store.transaction(|repo| {
        let post = find_post(repo, post_id)?;
        views::post_view(repo, post, viewer, true)
    })
}

pub fn list_posts(
    store: &Store,
    filter: &PostFilter,
    params: &PaginationParams,
    viewer: Option<Uuid>,
) -> AppResult<Paginated<PostView>> {
    store.transaction(|repo| {
        let (posts, total) = repo.list_posts(filter, PageRequest::from(params))?;
        let items = views::post_views(repo, posts, viewer, false)?;
        Ok(Paginated::new(items, total as u64, params))
    })
}

pub fn update_post(store: &Store, actor: &AuthUser, post_id: Uuid, req: UpdatePostRequest) -> AppResult<PostView> {
    validate_request(&req)?;
    let changes = UpdatePost {
        title: req.title.map(|t| t.trim().to_string()),
        content: req.content,
    };

    store.transaction(|repo| {
        let post = find_post(repo, post_id)?;
        permissions::authorize(&Method::PATCH, Some(actor), post.author_id)?;

        let post = repo.update_post(post_id, &changes)?;
        tracing::info!(post_id = %post_id, "post updated");
        views::post_view(repo, post, Some(actor.id), true)
    })
}

/// Delete a post with its comments, likes and the notifications pointing at them.
pub fn delete_post(store: &Store, actor: &AuthUser, post_id: Uuid) -> AppResult<()> {
    store.transaction(|repo| {
        let post = find_post(repo, post_id)?;
        permissions::authorize(&Method::DELETE, Some(actor), post.author_id)?;

        let mut targets = vec![NotificationTarget::Post(post_id)];
        targets.extend(
            repo.comment_ids_for_cleanup(&[post_id], None)?
                .into_iter()
                .map(NotificationTarget::Comment),
        );
        repo.delete_notifications_for(&targets)?;
        repo.delete_post(post_id)?;
        Ok(())
    })?;

    tracing::info!(post_id = %post_id, actor_id = %actor.id, "post deleted");
    Ok(())
}
