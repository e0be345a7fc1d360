//! Response shapes and the builders that resolve their related rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use rookery_shared::errors::{AppError, AppResult};
use rookery_shared::types::auth::UserRole;
use rookery_shared::types::pagination::PageRequest;

use crate::models::{Comment, Notification, NotificationTarget, Post, User, Verb};
use crate::store::SocialRepo;

/// Minimal user representation embedded in other resources.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub profile_picture: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub username: String,
    /// Only present on the caller's own profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub role: UserRole,
    pub follower_count: i64,
    pub following_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub author: UserSummary,
    pub title: String,
    pub content: String,
    pub comment_count: i64,
    pub likes_count: i64,
    pub has_liked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentView>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub actor: UserSummary,
    pub verb: Verb,
    pub verb_display: &'static str,
    pub target: Option<NotificationTarget>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LikeToggleView {
    pub has_liked: bool,
    pub created: bool,
    pub likes_count: i64,
    #[serde(skip)]
    pub post_author_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FollowView {
    pub following: bool,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct UnfollowView {
    pub following: bool,
    pub removed: bool,
}

/// Load summaries for every id in `ids`; a missing id is a broken reference.
pub fn summaries(repo: &mut dyn SocialRepo, ids: &[Uuid]) -> AppResult<HashMap<Uuid, UserSummary>> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let found: HashMap<Uuid, UserSummary> = repo
        .find_users(&unique)?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    if found.len() != unique.len() {
        return Err(AppError::internal("referenced user row is missing"));
    }
    Ok(found)
}

/// Summaries in the same order as `ids`.
pub fn ordered_summaries(repo: &mut dyn SocialRepo, ids: &[Uuid]) -> AppResult<Vec<UserSummary>> {
    let mut by_id = summaries(repo, ids)?;
    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

pub fn profile_view(
    repo: &mut dyn SocialRepo,
    user: &User,
    viewer: Option<Uuid>,
) -> AppResult<ProfileView> {
    let (follower_count, following_count) = repo.follow_counts(user.id)?;
    let own = viewer == Some(user.id);
    let is_following = match viewer {
        Some(viewer) if !own => Some(repo.follow_exists(viewer, user.id)?),
        _ => None,
    };

    Ok(ProfileView {
        id: user.id,
        username: user.username.clone(),
        email: own.then(|| user.email.clone()),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        bio: user.bio.clone(),
        profile_picture: user.profile_picture.clone(),
        role: user.role(),
        follower_count,
        following_count,
        is_following,
        date_joined: user.date_joined,
        updated_at: user.updated_at,
    })
}

pub fn comment_views(repo: &mut dyn SocialRepo, comments: Vec<Comment>) -> AppResult<Vec<CommentView>> {
    let author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    let authors = summaries(repo, &author_ids)?;

    comments
        .into_iter()
        .map(|c| {
            let author = authors
                .get(&c.author_id)
                .cloned()
                .ok_or_else(|| AppError::internal("comment author is missing"))?;
            Ok(CommentView {
                id: c.id,
                post_id: c.post_id,
                author,
                content: c.content,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
        })
        .collect()
}

pub fn comment_view(repo: &mut dyn SocialRepo, comment: Comment) -> AppResult<CommentView> {
    comment_views(repo, vec![comment])?
        .pop()
        .ok_or_else(|| AppError::internal("comment view was not built"))
}

/// Build post views for a listing. `with_comments` nests the full comment thread.
pub fn post_views(
    repo: &mut dyn SocialRepo,
    posts: Vec<Post>,
    viewer: Option<Uuid>,
    with_comments: bool,
) -> AppResult<Vec<PostView>> {
    let author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
    let authors = summaries(repo, &author_ids)?;

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let comment_counts = repo.comment_counts(&post_ids)?;
    let like_counts = repo.like_counts(&post_ids)?;
    let liked = viewer
        .map(|viewer| repo.liked_post_ids(viewer, &post_ids))
        .transpose()?
        .unwrap_or_default();

    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        let author = authors
            .get(&post.author_id)
            .cloned()
            .ok_or_else(|| AppError::internal("post author is missing"))?;
        let comments = if with_comments {
            let (rows, _) = repo.list_comments(post.id, PageRequest::all())?;
            Some(comment_views(repo, rows)?)
        } else {
            None
        };

        views.push(PostView {
            id: post.id,
            author,
            comment_count: comment_counts.get(&post.id).copied().unwrap_or(0),
            likes_count: like_counts.get(&post.id).copied().unwrap_or(0),
            has_liked: liked.contains(&post.id),
            comments,
            title: post.title,
            content: post.content,
            created_at: post.created_at,
            updated_at: post.updated_at,
        });
    }
    Ok(views)
}

pub fn post_view(
    repo: &mut dyn SocialRepo,
    post: Post,
    viewer: Option<Uuid>,
    with_comments: bool,
) -> AppResult<PostView> {
    post_views(repo, vec![post], viewer, with_comments)?
        .pop()
        .ok_or_else(|| AppError::internal("post view was not built"))
}

pub fn notification_views(
    repo: &mut dyn SocialRepo,
    notifications: Vec<Notification>,
) -> AppResult<Vec<NotificationView>> {
    let actor_ids: Vec<Uuid> = notifications.iter().map(|n| n.actor_id).collect();
    let actors = summaries(repo, &actor_ids)?;

    notifications
        .into_iter()
        .map(|n| {
            let actor = actors
                .get(&n.actor_id)
                .cloned()
                .ok_or_else(|| AppError::internal("notification actor is missing"))?;
            Ok(NotificationView {
                id: n.id,
                actor,
                verb: n.verb,
                verb_display: n.verb.display(),
                target: n.target,
                is_read: n.is_read,
                created_at: n.created_at,
            })
        })
        .collect()
}
