use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use rookery_shared::errors::{AppError, AppResult, ErrorCode};
use rookery_shared::types::pagination::PageRequest;

use super::{new_id, SocialRepo};
use crate::models::{
    Comment, Follow, Like, NewComment, NewFollow, NewLike, NewNotification, NewPost, NewUser,
    Notification, NotificationTarget, Post, PostFilter, UpdateComment, UpdatePost, UpdateUser,
    User,
};

/// Rows are kept in insertion order, so reversing a scan yields newest first.
#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    follows: Vec<Follow>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
    notifications: Vec<Notification>,
}

/// In-process store used for local runs and tests.
///
/// Transactions hold the write lock throughout, so they are serialized. The
/// tables are copied on the first write only; a transaction that just reads
/// never clones them, and a copy is swapped in only when the closure succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub(super) fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut dyn SocialRepo) -> AppResult<T>,
    {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| AppError::internal("memory store lock poisoned"))?;

        let (out, written) = {
            let mut repo = MemoryRepo {
                tables: Cow::Borrowed(&*guard),
            };
            let out = f(&mut repo)?;
            (out, repo.into_written())
        };
        if let Some(tables) = written {
            *guard = tables;
        }
        Ok(out)
    }
}

struct MemoryRepo<'t> {
    tables: Cow<'t, Tables>,
}

fn foreign_key_violation(what: &str) -> AppError {
    AppError::Database(DieselError::DatabaseError(
        DatabaseErrorKind::ForeignKeyViolation,
        Box::new(format!("referenced {what} does not exist")),
    ))
}

fn window<T>(rows: impl Iterator<Item = T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset).unwrap_or(0);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    rows.skip(offset).take(limit).collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl PostFilter {
    fn matches(&self, post: &Post) -> bool {
        self.title.as_deref().map_or(true, |t| contains_ci(&post.title, t))
            && self.content.as_deref().map_or(true, |c| contains_ci(&post.content, c))
            && self.author_id.map_or(true, |a| post.author_id == a)
            && self
                .author_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&post.author_id))
    }
}

impl MemoryRepo<'_> {
    /// The working copy, cloned from the committed tables on first use.
    fn rows_mut(&mut self) -> &mut Tables {
        self.tables.to_mut()
    }

    /// The modified tables, if anything was written.
    fn into_written(self) -> Option<Tables> {
        match self.tables {
            Cow::Owned(tables) => Some(tables),
            Cow::Borrowed(_) => None,
        }
    }

    fn user_exists(&self, id: Uuid) -> bool {
        self.tables.users.iter().any(|u| u.id == id)
    }

    fn post_exists(&self, id: Uuid) -> bool {
        self.tables.posts.iter().any(|p| p.id == id)
    }

    fn remove_posts(&mut self, ids: &[Uuid]) {
        let t = self.rows_mut();
        t.posts.retain(|p| !ids.contains(&p.id));
        t.comments.retain(|c| !ids.contains(&c.post_id));
        t.likes.retain(|l| !ids.contains(&l.post_id));
    }
}

impl SocialRepo for MemoryRepo<'_> {
    // --- users ---

    fn insert_user(&mut self, new: &NewUser) -> AppResult<User> {
        if self.tables.users.iter().any(|u| u.username == new.username) {
            return Err(AppError::new(ErrorCode::UsernameTaken, "a user with that username already exists"));
        }
        if self.tables.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::new(ErrorCode::EmailTaken, "a user with that email already exists"));
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            username: new.username.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            bio: new.bio.clone(),
            profile_picture: None,
            role: new.role.clone(),
            date_joined: now,
            updated_at: now,
        };
        self.rows_mut().users.push(user.clone());
        Ok(user)
    }

    fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        Ok(self.tables.users.iter().find(|u| u.username == username).cloned())
    }

    fn find_users(&mut self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        Ok(self
            .tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    fn update_user(&mut self, id: Uuid, changes: &UpdateUser) -> AppResult<User> {
        if let Some(email) = &changes.email {
            if self.tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::new(ErrorCode::EmailTaken, "a user with that email already exists"));
            }
        }

        if changes.is_empty() {
            return self.find_user(id)?.ok_or(AppError::Database(DieselError::NotFound));
        }

        let user = self
            .rows_mut()
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::Database(DieselError::NotFound))?;

        if let Some(v) = &changes.email {
            user.email = v.clone();
        }
        if let Some(v) = &changes.first_name {
            user.first_name = v.clone();
        }
        if let Some(v) = &changes.last_name {
            user.last_name = v.clone();
        }
        if let Some(v) = &changes.bio {
            user.bio = v.clone();
        }
        if let Some(v) = &changes.profile_picture {
            user.profile_picture = Some(v.clone());
        }
        if let Some(v) = &changes.role {
            user.role = v.clone();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn delete_user(&mut self, id: Uuid) -> AppResult<bool> {
        if !self.user_exists(id) {
            return Ok(false);
        }

        let owned_posts: Vec<Uuid> = self
            .tables
            .posts
            .iter()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        self.remove_posts(&owned_posts);

        let t = self.rows_mut();
        t.users.retain(|u| u.id != id);
        t.follows.retain(|f| f.follower_id != id && f.following_id != id);
        t.comments.retain(|c| c.author_id != id);
        t.likes.retain(|l| l.user_id != id);
        t.notifications.retain(|n| n.recipient_id != id && n.actor_id != id);
        Ok(true)
    }

    // --- follow graph ---

    fn insert_follow(&mut self, new: &NewFollow) -> AppResult<bool> {
        if new.follower_id == new.following_id {
            return Err(AppError::new(ErrorCode::CannotFollowSelf, "you cannot follow yourself"));
        }
        if !self.user_exists(new.follower_id) || !self.user_exists(new.following_id) {
            return Err(foreign_key_violation("user"));
        }
        if self.follow_exists(new.follower_id, new.following_id)? {
            return Ok(false);
        }

        self.rows_mut().follows.push(Follow {
            follower_id: new.follower_id,
            following_id: new.following_id,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    fn delete_follow(&mut self, follower_id: Uuid, following_id: Uuid) -> AppResult<bool> {
        if !self.follow_exists(follower_id, following_id)? {
            return Ok(false);
        }
        self.rows_mut()
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(true)
    }

    fn follow_exists(&mut self, follower_id: Uuid, following_id: Uuid) -> AppResult<bool> {
        Ok(self
            .tables
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id))
    }

    fn following_ids(&mut self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .tables
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id)
            .collect())
    }

    fn follow_counts(&mut self, user_id: Uuid) -> AppResult<(i64, i64)> {
        let follows = &self.tables.follows;
        let followers = follows.iter().filter(|f| f.following_id == user_id).count() as i64;
        let following = follows.iter().filter(|f| f.follower_id == user_id).count() as i64;
        Ok((followers, following))
    }

    fn list_followers(&mut self, user_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)> {
        let edges = self.tables.follows.iter().rev().filter(|f| f.following_id == user_id);
        let total = edges.clone().count() as i64;
        Ok((window(edges.map(|f| f.follower_id), page), total))
    }

    fn list_following(&mut self, user_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)> {
        let edges = self.tables.follows.iter().rev().filter(|f| f.follower_id == user_id);
        let total = edges.clone().count() as i64;
        Ok((window(edges.map(|f| f.following_id), page), total))
    }

    // --- posts ---

    fn insert_post(&mut self, new: &NewPost) -> AppResult<Post> {
        if !self.user_exists(new.author_id) {
            return Err(foreign_key_violation("user"));
        }

        let now = Utc::now();
        let post = Post {
            id: new_id(),
            author_id: new.author_id,
            title: new.title.clone(),
            content: new.content.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows_mut().posts.push(post.clone());
        Ok(post)
    }

    fn find_post(&mut self, id: Uuid) -> AppResult<Option<Post>> {
        Ok(self.tables.posts.iter().find(|p| p.id == id).cloned())
    }

    fn update_post(&mut self, id: Uuid, changes: &UpdatePost) -> AppResult<Post> {
        if changes.is_empty() {
            return self.find_post(id)?.ok_or(AppError::Database(DieselError::NotFound));
        }

        let post = self
            .rows_mut()
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(AppError::Database(DieselError::NotFound))?;

        if let Some(title) = &changes.title {
            post.title = title.clone();
        }
        if let Some(content) = &changes.content {
            post.content = content.clone();
        }
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    fn delete_post(&mut self, id: Uuid) -> AppResult<bool> {
        if !self.post_exists(id) {
            return Ok(false);
        }
        self.remove_posts(&[id]);
        Ok(true)
    }

    fn list_posts(&mut self, filter: &PostFilter, page: PageRequest) -> AppResult<(Vec<Post>, i64)> {
        let matching = self.tables.posts.iter().rev().filter(|p| filter.matches(p));
        let total = matching.clone().count() as i64;
        Ok((window(matching.cloned(), page), total))
    }

    fn post_ids_by_author(&mut self, author_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .tables
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .map(|p| p.id)
            .collect())
    }

    // --- comments ---

    fn insert_comment(&mut self, new: &NewComment) -> AppResult<Comment> {
        if !self.post_exists(new.post_id) {
            return Err(foreign_key_violation("post"));
        }
        if !self.user_exists(new.author_id) {
            return Err(foreign_key_violation("user"));
        }

        let now = Utc::now();
        let comment = Comment {
            id: new_id(),
            post_id: new.post_id,
            author_id: new.author_id,
            content: new.content.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows_mut().comments.push(comment.clone());
        Ok(comment)
    }

    fn find_comment(&mut self, id: Uuid) -> AppResult<Option<Comment>> {
        Ok(self.tables.comments.iter().find(|c| c.id == id).cloned())
    }

    fn update_comment(&mut self, id: Uuid, changes: &UpdateComment) -> AppResult<Comment> {
        let Some(content) = &changes.content else {
            return self.find_comment(id)?.ok_or(AppError::Database(DieselError::NotFound));
        };

        let comment = self
            .rows_mut()
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::Database(DieselError::NotFound))?;
        comment.content = content.clone();
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    fn delete_comment(&mut self, id: Uuid) -> AppResult<bool> {
        if !self.tables.comments.iter().any(|c| c.id == id) {
            return Ok(false);
        }
        self.rows_mut().comments.retain(|c| c.id != id);
        Ok(true)
    }

    fn list_comments(&mut self, post_id: Uuid, page: PageRequest) -> AppResult<(Vec<Comment>, i64)> {
        let matching = self.tables.comments.iter().filter(|c| c.post_id == post_id);
        let total = matching.clone().count() as i64;
        Ok((window(matching.cloned(), page), total))
    }

    fn comment_counts(&mut self, post_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>> {
        let mut counts = HashMap::new();
        for c in self.tables.comments.iter().filter(|c| post_ids.contains(&c.post_id)) {
            *counts.entry(c.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn comment_ids_for_cleanup(&mut self, post_ids: &[Uuid], author_id: Option<Uuid>) -> AppResult<Vec<Uuid>> {
        Ok(self
            .tables
            .comments
            .iter()
            .filter(|c| post_ids.contains(&c.post_id) || Some(c.author_id) == author_id)
            .map(|c| c.id)
            .collect())
    }

    // --- likes ---

    fn insert_like(&mut self, new: &NewLike) -> AppResult<Option<Like>> {
        if !self.post_exists(new.post_id) {
            return Err(foreign_key_violation("post"));
        }
        if !self.user_exists(new.user_id) {
            return Err(foreign_key_violation("user"));
        }
        if self.like_exists(new.user_id, new.post_id)? {
            return Ok(None);
        }

        let like = Like {
            id: new_id(),
            user_id: new.user_id,
            post_id: new.post_id,
            created_at: Utc::now(),
        };
        self.rows_mut().likes.push(like.clone());
        Ok(Some(like))
    }

    fn delete_like(&mut self, user_id: Uuid, post_id: Uuid) -> AppResult<bool> {
        if !self.like_exists(user_id, post_id)? {
            return Ok(false);
        }
        self.rows_mut()
            .likes
            .retain(|l| !(l.user_id == user_id && l.post_id == post_id));
        Ok(true)
    }

    fn like_exists(&mut self, user_id: Uuid, post_id: Uuid) -> AppResult<bool> {
        Ok(self
            .tables
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.post_id == post_id))
    }

    fn count_likes(&mut self, post_id: Uuid) -> AppResult<i64> {
        Ok(self.tables.likes.iter().filter(|l| l.post_id == post_id).count() as i64)
    }

    fn like_counts(&mut self, post_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>> {
        let mut counts = HashMap::new();
        for l in self.tables.likes.iter().filter(|l| post_ids.contains(&l.post_id)) {
            *counts.entry(l.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn liked_post_ids(&mut self, user_id: Uuid, post_ids: &[Uuid]) -> AppResult<HashSet<Uuid>> {
        Ok(self
            .tables
            .likes
            .iter()
            .filter(|l| l.user_id == user_id && post_ids.contains(&l.post_id))
            .map(|l| l.post_id)
            .collect())
    }

    fn list_likers(&mut self, post_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)> {
        let matching = self.tables.likes.iter().rev().filter(|l| l.post_id == post_id);
        let total = matching.clone().count() as i64;
        Ok((window(matching.map(|l| l.user_id), page), total))
    }

    // --- notifications ---

    fn insert_notification(&mut self, new: &NewNotification) -> AppResult<Notification> {
        if !self.user_exists(new.recipient_id) || !self.user_exists(new.actor_id) {
            return Err(foreign_key_violation("user"));
        }

        let notification = Notification {
            id: new_id(),
            recipient_id: new.recipient_id,
            actor_id: new.actor_id,
            verb: new.verb,
            target: new.target,
            is_read: false,
            created_at: Utc::now(),
        };
        self.rows_mut().notifications.push(notification.clone());
        Ok(notification)
    }

    fn list_notifications(
        &mut self,
        recipient_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> AppResult<(Vec<Notification>, i64)> {
        let matching = self
            .tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read));
        let total = matching.clone().count() as i64;
        Ok((window(matching.cloned(), page), total))
    }

    fn count_unread(&mut self, recipient_id: Uuid) -> AppResult<i64> {
        Ok(self
            .tables
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as i64)
    }

    fn mark_read(&mut self, id: Uuid, recipient_id: Uuid) -> AppResult<Option<Notification>> {
        let owned = self
            .tables
            .notifications
            .iter()
            .any(|n| n.id == id && n.recipient_id == recipient_id);
        if !owned {
            return Ok(None);
        }
        Ok(self
            .rows_mut()
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }

    fn mark_all_read(&mut self, recipient_id: Uuid) -> AppResult<usize> {
        if self.count_unread(recipient_id)? == 0 {
            return Ok(0);
        }

        let mut updated = 0;
        for n in self
            .rows_mut()
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    fn delete_notifications_for(&mut self, targets: &[NotificationTarget]) -> AppResult<usize> {
        let doomed = |n: &Notification| n.target.map_or(false, |t| targets.contains(&t));
        let removed = self.tables.notifications.iter().filter(|n| doomed(*n)).count();
        if removed > 0 {
            self.rows_mut().notifications.retain(|n| !doomed(n));
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Verb;
    use crate::store::Store;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: "member".to_string(),
        }
    }

    fn new_post(author_id: Uuid, title: &str) -> NewPost {
        NewPost {
            author_id,
            title: title.to_string(),
            content: format!("{title} body"),
        }
    }

    #[test]
    fn unique_username_and_email() {
        let store = Store::memory();
        store.transaction(|repo| repo.insert_user(&new_user("ada"))).unwrap();

        let err = store.transaction(|repo| repo.insert_user(&new_user("ada"))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UsernameTaken);

        let mut other = new_user("grace");
        other.email = "ada@example.com".into();
        let err = store.transaction(|repo| repo.insert_user(&other)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmailTaken);
    }

    #[test]
    fn failed_transaction_rolls_back_every_write() {
        let store = Store::memory();
        let (author, post) = store
            .transaction(|repo| {
                let author = repo.insert_user(&new_user("ada"))?;
                let post = repo.insert_post(&new_post(author.id, "hello"))?;
                Ok((author, post))
            })
            .unwrap();

        // The like lands, then the notification insert fails on an unknown recipient.
        let result = store.transaction(|repo| {
            repo.insert_like(&NewLike { user_id: author.id, post_id: post.id })?;
            repo.insert_notification(&NewNotification {
                recipient_id: Uuid::new_v4(),
                actor_id: author.id,
                verb: Verb::Like,
                target: Some(NotificationTarget::Post(post.id)),
            })
        });
        assert!(result.is_err());

        let likes = store.transaction(|repo| repo.count_likes(post.id)).unwrap();
        assert_eq!(likes, 0);
    }

    #[test]
    fn second_like_of_the_same_pair_reports_existing() {
        let store = Store::memory();
        store
            .transaction(|repo| {
                let author = repo.insert_user(&new_user("ada"))?;
                let fan = repo.insert_user(&new_user("grace"))?;
                let post = repo.insert_post(&new_post(author.id, "hello"))?;
                let like = NewLike { user_id: fan.id, post_id: post.id };

                assert!(repo.insert_like(&like)?.is_some());
                assert!(repo.insert_like(&like)?.is_none());
                assert_eq!(repo.count_likes(post.id)?, 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn batch_counts_cover_only_requested_posts() {
        let store = Store::memory();
        store
            .transaction(|repo| {
                let a = repo.insert_user(&new_user("a"))?;
                let b = repo.insert_user(&new_user("b"))?;
                let first = repo.insert_post(&new_post(a.id, "first"))?;
                let second = repo.insert_post(&new_post(a.id, "second"))?;
                let quiet = repo.insert_post(&new_post(b.id, "quiet"))?;

                for user in [a.id, b.id] {
                    repo.insert_like(&NewLike { user_id: user, post_id: first.id })?;
                }
                repo.insert_like(&NewLike { user_id: b.id, post_id: second.id })?;
                repo.insert_comment(&NewComment {
                    post_id: second.id,
                    author_id: b.id,
                    content: "hi".into(),
                })?;

                let ids = [first.id, second.id, quiet.id];
                let likes = repo.like_counts(&ids)?;
                assert_eq!(likes.get(&first.id), Some(&2));
                assert_eq!(likes.get(&second.id), Some(&1));
                assert!(!likes.contains_key(&quiet.id));

                let comments = repo.comment_counts(&ids)?;
                assert_eq!(comments.get(&second.id), Some(&1));
                assert_eq!(comments.len(), 1);

                let liked = repo.liked_post_ids(b.id, &[first.id, quiet.id])?;
                assert!(liked.contains(&first.id));
                assert_eq!(liked.len(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn only_writes_copy_the_tables() {
        let committed = Tables::default();

        let mut repo = MemoryRepo { tables: Cow::Borrowed(&committed) };
        assert!(repo.find_user(Uuid::new_v4()).unwrap().is_none());
        assert!(repo.mark_read(Uuid::new_v4(), Uuid::new_v4()).unwrap().is_none());
        assert!(!repo.delete_like(Uuid::new_v4(), Uuid::new_v4()).unwrap());
        assert_eq!(repo.mark_all_read(Uuid::new_v4()).unwrap(), 0);
        assert!(repo.into_written().is_none());

        let mut repo = MemoryRepo { tables: Cow::Borrowed(&committed) };
        let user = repo.insert_user(&new_user("ada")).unwrap();
        assert_eq!(user.id.get_version_num(), 7);
        let written = repo.into_written().unwrap();
        assert_eq!(written.users.len(), 1);
        assert!(committed.users.is_empty());
    }

    #[test]
    fn follow_pairs_are_unique_and_never_reflexive() {
        let store = Store::memory();
        store
            .transaction(|repo| {
                let a = repo.insert_user(&new_user("a"))?;
                let b = repo.insert_user(&new_user("b"))?;
                let edge = NewFollow { follower_id: a.id, following_id: b.id };

                assert!(repo.insert_follow(&edge)?);
                assert!(!repo.insert_follow(&edge)?);
                assert!(repo.follow_exists(a.id, b.id)?);
                assert!(!repo.follow_exists(b.id, a.id)?);

                let err = repo
                    .insert_follow(&NewFollow { follower_id: a.id, following_id: a.id })
                    .unwrap_err();
                assert_eq!(err.code(), ErrorCode::CannotFollowSelf);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn posts_list_newest_first_with_filters() {
        let store = Store::memory();
        store
            .transaction(|repo| {
                let a = repo.insert_user(&new_user("a"))?;
                let b = repo.insert_user(&new_user("b"))?;
                repo.insert_post(&new_post(a.id, "Rust tips"))?;
                repo.insert_post(&new_post(b.id, "Gardening"))?;
                repo.insert_post(&new_post(a.id, "More RUST"))?;

                let (all, total) = repo.list_posts(&PostFilter::default(), PageRequest::all())?;
                assert_eq!(total, 3);
                assert_eq!(all[0].title, "More RUST");
                assert_eq!(all[2].title, "Rust tips");

                let filter = PostFilter { title: Some("rust".into()), ..Default::default() };
                let (rusty, _) = repo.list_posts(&filter, PageRequest::all())?;
                assert_eq!(rusty.len(), 2);

                let filter = PostFilter { author_ids: Some(vec![]), ..Default::default() };
                let (none, total) = repo.list_posts(&filter, PageRequest::all())?;
                assert!(none.is_empty());
                assert_eq!(total, 0);

                let (page, total) = repo.list_posts(
                    &PostFilter::default(),
                    PageRequest { limit: 1, offset: 1 },
                )?;
                assert_eq!(total, 3);
                assert_eq!(page[0].title, "Gardening");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn deleting_a_user_cascades() {
        let store = Store::memory();
        let (a, b, post) = store
            .transaction(|repo| {
                let a = repo.insert_user(&new_user("a"))?;
                let b = repo.insert_user(&new_user("b"))?;
                let post = repo.insert_post(&new_post(a.id, "hello"))?;
                repo.insert_follow(&NewFollow { follower_id: b.id, following_id: a.id })?;
                repo.insert_like(&NewLike { user_id: b.id, post_id: post.id })?;
                repo.insert_comment(&NewComment {
                    post_id: post.id,
                    author_id: b.id,
                    content: "nice".into(),
                })?;
                repo.insert_notification(&NewNotification {
                    recipient_id: a.id,
                    actor_id: b.id,
                    verb: Verb::Follow,
                    target: None,
                })?;
                Ok((a, b, post))
            })
            .unwrap();

        store
            .transaction(|repo| {
                assert!(repo.delete_user(a.id)?);
                assert!(repo.find_post(post.id)?.is_none());
                assert_eq!(repo.count_likes(post.id)?, 0);
                assert!(repo.comment_counts(&[post.id])?.is_empty());
                assert!(repo.following_ids(b.id)?.is_empty());
                assert_eq!(repo.count_unread(a.id)?, 0);
                assert!(!repo.delete_user(a.id)?);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn mark_read_is_scoped_to_recipient() {
        let store = Store::memory();
        store
            .transaction(|repo| {
                let a = repo.insert_user(&new_user("a"))?;
                let b = repo.insert_user(&new_user("b"))?;
                let n = repo.insert_notification(&NewNotification {
                    recipient_id: a.id,
                    actor_id: b.id,
                    verb: Verb::Follow,
                    target: None,
                })?;

                assert!(repo.mark_read(n.id, b.id)?.is_none());
                assert_eq!(repo.count_unread(a.id)?, 1);
                assert!(repo.mark_read(n.id, a.id)?.unwrap().is_read);
                assert_eq!(repo.count_unread(a.id)?, 0);
                assert_eq!(repo.mark_all_read(a.id)?, 0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn notifications_for_deleted_targets_are_removed() {
        let store = Store::memory();
        store
            .transaction(|repo| {
                let a = repo.insert_user(&new_user("a"))?;
                let b = repo.insert_user(&new_user("b"))?;
                let post = repo.insert_post(&new_post(a.id, "hello"))?;
                for verb in [Verb::Like, Verb::Follow] {
                    let target = (verb == Verb::Like).then_some(NotificationTarget::Post(post.id));
                    repo.insert_notification(&NewNotification {
                        recipient_id: a.id,
                        actor_id: b.id,
                        verb,
                        target,
                    })?;
                }

                let removed = repo.delete_notifications_for(&[NotificationTarget::Post(post.id)])?;
                assert_eq!(removed, 1);
                let (left, _) = repo.list_notifications(a.id, false, PageRequest::all())?;
                assert_eq!(left.len(), 1);
                assert_eq!(left[0].verb, Verb::Follow);
                Ok(())
            })
            .unwrap();
    }
}
