//! Persistence seam.
//!
//! Every request runs its reads and writes through [`Store::transaction`],
//! which hands the closure a [`SocialRepo`]. The closure's writes commit when
//! it returns `Ok` and roll back when it returns `Err`, so a triggering write
//! and the notification it produces land together or not at all.

mod memory;
mod postgres;

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use rookery_shared::clients::db::DbPool;
use rookery_shared::errors::{AppError, AppResult};
use rookery_shared::types::pagination::PageRequest;

use crate::models::{
    Comment, Like, NewComment, NewFollow, NewLike, NewNotification, NewPost, NewUser,
    Notification, NotificationTarget, Post, PostFilter, UpdateComment, UpdatePost, UpdateUser,
    User,
};

pub use memory::MemoryStore;

/// Primary key for a new row. Both backends assign ids here, so ties on
/// `created_at` break in insertion order everywhere.
pub(crate) fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// Row-level operations over the social tables.
///
/// List methods return the requested page together with the total row count.
/// Inserts on unique pairs (follows, likes) report an existing row instead of failing.
pub trait SocialRepo {
    // --- users ---
    fn insert_user(&mut self, new: &NewUser) -> AppResult<User>;
    fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>>;
    fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>>;
    fn find_users(&mut self, ids: &[Uuid]) -> AppResult<Vec<User>>;
    fn update_user(&mut self, id: Uuid, changes: &UpdateUser) -> AppResult<User>;
    /// Deletes the user and everything it owns (posts, comments, likes, edges, notifications).
    fn delete_user(&mut self, id: Uuid) -> AppResult<bool>;

    // --- follow graph ---
    /// Returns `false` when the edge already existed.
    fn insert_follow(&mut self, new: &NewFollow) -> AppResult<bool>;
    fn delete_follow(&mut self, follower_id: Uuid, following_id: Uuid) -> AppResult<bool>;
    fn follow_exists(&mut self, follower_id: Uuid, following_id: Uuid) -> AppResult<bool>;
    fn following_ids(&mut self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
    /// `(followers, following)` for the user.
    fn follow_counts(&mut self, user_id: Uuid) -> AppResult<(i64, i64)>;
    /// Users following `user_id`, newest edge first.
    fn list_followers(&mut self, user_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)>;
    /// Users `user_id` follows, newest edge first.
    fn list_following(&mut self, user_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)>;

    // --- posts ---
    fn insert_post(&mut self, new: &NewPost) -> AppResult<Post>;
    fn find_post(&mut self, id: Uuid) -> AppResult<Option<Post>>;
    fn update_post(&mut self, id: Uuid, changes: &UpdatePost) -> AppResult<Post>;
    /// Deletes the post with its comments and likes.
    fn delete_post(&mut self, id: Uuid) -> AppResult<bool>;
    /// Newest first.
    fn list_posts(&mut self, filter: &PostFilter, page: PageRequest) -> AppResult<(Vec<Post>, i64)>;
    fn post_ids_by_author(&mut self, author_id: Uuid) -> AppResult<Vec<Uuid>>;

    // --- comments ---
    fn insert_comment(&mut self, new: &NewComment) -> AppResult<Comment>;
    fn find_comment(&mut self, id: Uuid) -> AppResult<Option<Comment>>;
    fn update_comment(&mut self, id: Uuid, changes: &UpdateComment) -> AppResult<Comment>;
    fn delete_comment(&mut self, id: Uuid) -> AppResult<bool>;
    /// Oldest first.
    fn list_comments(&mut self, post_id: Uuid, page: PageRequest) -> AppResult<(Vec<Comment>, i64)>;
    /// Comment count per post; posts without comments are absent.
    fn comment_counts(&mut self, post_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>>;
    /// Comments on any of `post_ids` plus comments written by `author_id`.
    fn comment_ids_for_cleanup(&mut self, post_ids: &[Uuid], author_id: Option<Uuid>) -> AppResult<Vec<Uuid>>;

    // --- likes ---
    /// Returns `None` when the (user, post) pair already exists.
    fn insert_like(&mut self, new: &NewLike) -> AppResult<Option<Like>>;
    fn delete_like(&mut self, user_id: Uuid, post_id: Uuid) -> AppResult<bool>;
    fn like_exists(&mut self, user_id: Uuid, post_id: Uuid) -> AppResult<bool>;
    fn count_likes(&mut self, post_id: Uuid) -> AppResult<i64>;
    /// Like count per post; posts without likes are absent.
    fn like_counts(&mut self, post_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>>;
    /// The subset of `post_ids` that `user_id` has liked.
    fn liked_post_ids(&mut self, user_id: Uuid, post_ids: &[Uuid]) -> AppResult<HashSet<Uuid>>;
    /// Users who liked the post, newest like first.
    fn list_likers(&mut self, post_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)>;

    // --- notifications ---
    fn insert_notification(&mut self, new: &NewNotification) -> AppResult<Notification>;
    /// Newest first.
    fn list_notifications(
        &mut self,
        recipient_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> AppResult<(Vec<Notification>, i64)>;
    fn count_unread(&mut self, recipient_id: Uuid) -> AppResult<i64>;
    /// `None` when the notification does not exist or belongs to someone else.
    fn mark_read(&mut self, id: Uuid, recipient_id: Uuid) -> AppResult<Option<Notification>>;
    fn mark_all_read(&mut self, recipient_id: Uuid) -> AppResult<usize>;
    fn delete_notifications_for(&mut self, targets: &[NotificationTarget]) -> AppResult<usize>;
}

/// The configured storage backend.
pub enum Store {
    Postgres(DbPool),
    Memory(MemoryStore),
}

impl Store {
    pub fn postgres(pool: DbPool) -> Self {
        Store::Postgres(pool)
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore::default())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "postgres",
            Store::Memory(_) => "memory",
        }
    }

    /// Run `f` atomically against the store.
    pub fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn SocialRepo) -> AppResult<T>,
    {
        match self {
            Store::Postgres(pool) => {
                let mut pooled = pool.get().map_err(|e| {
                    tracing::error!(error = %e, "failed to get db connection");
                    AppError::internal("database connection error")
                })?;
                postgres::run_transaction(&mut pooled, f)
            }
            Store::Memory(memory) => memory.transaction(f),
        }
    }

    /// Liveness check for the health endpoint.
    pub fn ping(&self) -> AppResult<()> {
        match self {
            Store::Postgres(pool) => {
                let mut pooled = pool.get().map_err(|e| AppError::internal(e.to_string()))?;
                postgres::ping(&mut pooled)
            }
            Store::Memory(_) => Ok(()),
        }
    }
}
