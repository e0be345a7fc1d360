use uuid::Uuid;

use rookery_shared::errors::{AppError, AppResult, ErrorCode};
use rookery_shared::types::pagination::{PageRequest, Paginated, PaginationParams};

use super::notification_service;
use crate::models::{NewFollow, PostFilter, Verb};
use crate::store::{SocialRepo, Store};
use crate::views::{self, FollowView, PostView, UnfollowView, UserSummary};

fn require_user(repo: &mut dyn SocialRepo, user_id: Uuid) -> AppResult<()> {
    match repo.find_user(user_id)? {
        Some(_) => Ok(()),
        None => Err(AppError::new(ErrorCode::UserNotFound, "user not found")),
    }
}

fn cannot_follow_self() -> AppError {
    AppError::new(ErrorCode::CannotFollowSelf, "you cannot follow yourself")
}

/// Add the edge `actor -> target`. Following twice is a no-op.
pub fn follow(store: &Store, actor_id: Uuid, target_id: Uuid) -> AppResult<FollowView> {
    let created = store.transaction(|repo| {
        require_user(repo, target_id)?;
        if actor_id == target_id {
            return Err(cannot_follow_self());
        }

        let created = repo.insert_follow(&NewFollow {
            follower_id: actor_id,
            following_id: target_id,
        })?;
        if created {
            notification_service::notify(repo, target_id, actor_id, Verb::Follow, None)?;
        }
        Ok(created)
    })?;

    if created {
        tracing::info!(follower_id = %actor_id, following_id = %target_id, "follow created");
    }
    Ok(FollowView { following: true, created })
}

/// Remove the edge `actor -> target` if present.
pub fn unfollow(store: &Store, actor_id: Uuid, target_id: Uuid) -> AppResult<UnfollowView> {
    let removed = store.transaction(|repo| {
        require_user(repo, target_id)?;
        if actor_id == target_id {
            return Err(cannot_follow_self());
        }
        repo.delete_follow(actor_id, target_id)
    })?;

    if removed {
        tracing::info!(follower_id = %actor_id, following_id = %target_id, "follow removed");
    }
    Ok(UnfollowView { following: false, removed })
}

pub fn is_following(store: &Store, actor_id: Uuid, target_id: Uuid) -> AppResult<bool> {
    store.transaction(|repo| repo.follow_exists(actor_id, target_id))
}

pub fn followers(store: &Store, user_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<UserSummary>> {
    store.transaction(|repo| {
        require_user(repo, user_id)?;
        let (ids, total) = repo.list_followers(user_id, PageRequest::from(params))?;
        let items = views::ordered_summaries(repo, &ids)?;
        Ok(Paginated::new(items, total as u64, params))
    })
}

pub fn following(store: &Store, user_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<UserSummary>> {
    store.transaction(|repo| {
        require_user(repo, user_id)?;
        let (ids, total) = repo.list_following(user_id, PageRequest::from(params))?;
        let items = views::ordered_summaries(repo, &ids)?;
        Ok(Paginated::new(items, total as u64, params))
    })
}

/// Posts by the users `user_id` follows, newest first.
pub fn feed(store: &Store, user_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<PostView>> {
    store.transaction(|repo| {
        let filter = PostFilter {
            author_ids: Some(repo.following_ids(user_id)?),
            ..Default::default()
        };
        let (posts, total) = repo.list_posts(&filter, PageRequest::from(params))?;
        let items = views::post_views(repo, posts, Some(user_id), false)?;
        Ok(Paginated::new(items, total as u64, params))
    })
}
