use uuid::Uuid;

use rookery_shared::errors::AppResult;
use rookery_shared::types::auth::AuthUser;
use rookery_shared::types::pagination::{PageRequest, Paginated, PaginationParams};

use super::notification_service;
use super::post_service::find_post;
use crate::models::{NewLike, NotificationTarget, Verb};
use crate::store::{SocialRepo, Store};
use crate::views::{self, LikeToggleView, UserSummary};

/// Like the post, or take the like back if one exists.
///
/// An insert that loses a race against a concurrent like of the same pair is
/// reported as already liked and notifies nobody.
pub fn toggle_like(store: &Store, actor: &AuthUser, post_id: Uuid) -> AppResult<LikeToggleView> {
    let view = store.transaction(|repo| toggle_in(repo, actor, post_id))?;

    tracing::info!(
        post_id = %post_id,
        user_id = %actor.id,
        has_liked = view.has_liked,
        "like toggled"
    );
    Ok(view)
}

fn toggle_in(repo: &mut dyn SocialRepo, actor: &AuthUser, post_id: Uuid) -> AppResult<LikeToggleView> {
    let post = find_post(repo, post_id)?;

    let (has_liked, created) = if repo.like_exists(actor.id, post_id)? {
        repo.delete_like(actor.id, post_id)?;
        (false, false)
    } else {
        let inserted = repo.insert_like(&NewLike {
            user_id: actor.id,
            post_id,
        })?;
        if inserted.is_some() {
            notification_service::notify(
                repo,
                post.author_id,
                actor.id,
                Verb::Like,
                Some(NotificationTarget::Post(post_id)),
            )?;
        }
        (true, inserted.is_some())
    };

    Ok(LikeToggleView {
        has_liked,
        created,
        likes_count: repo.count_likes(post_id)?,
        post_author_id: post.author_id,
    })
}

/// Users who liked the post, newest like first.
pub fn list_likes(store: &Store, post_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<UserSummary>> {
    store.transaction(|repo| {
        find_post(repo, post_id)?;
        let (ids, total) = repo.list_likers(post_id, PageRequest::from(params))?;
        let items = views::ordered_summaries(repo, &ids)?;
        Ok(Paginated::new(items, total as u64, params))
    })
}
