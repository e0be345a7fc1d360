use std::collections::{HashMap, HashSet};

use chrono::Utc;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::dsl::count;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use rookery_shared::errors::{AppError, AppResult, ErrorCode};
use rookery_shared::types::pagination::PageRequest;

use super::{new_id, SocialRepo};
use crate::models::{
    Comment, Like, NewComment, NewFollow, NewLike, NewNotification, NewNotificationRow, NewPost,
    NewUser, Notification, NotificationRow, NotificationTarget, Post, PostFilter, UpdateComment,
    UpdatePost, UpdateUser, User,
};
use crate::schema::{comments, follows, likes, notifications, posts, users};

const EMAIL_CONSTRAINT: &str = "users_email_key";

/// `SocialRepo` over a single Postgres connection that is already inside a transaction.
struct PgRepo<'c> {
    conn: &'c mut PgConnection,
}

pub(super) fn run_transaction<T, F>(conn: &mut PgConnection, f: F) -> AppResult<T>
where
    F: FnOnce(&mut dyn SocialRepo) -> AppResult<T>,
{
    conn.transaction::<T, AppError, _>(|conn| {
        let mut repo = PgRepo { conn };
        f(&mut repo)
    })
}

pub(super) fn ping(conn: &mut PgConnection) -> AppResult<()> {
    diesel::sql_query("SELECT 1").execute(conn)?;
    Ok(())
}

/// Unique violations on `users` become the matching account error.
fn user_conflict(err: DieselError) -> AppError {
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &err {
        return if info.constraint_name() == Some(EMAIL_CONSTRAINT) {
            AppError::new(ErrorCode::EmailTaken, "a user with that email already exists")
        } else {
            AppError::new(ErrorCode::UsernameTaken, "a user with that username already exists")
        };
    }
    AppError::Database(err)
}

fn follow_violation(err: DieselError) -> AppError {
    if let DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _) = &err {
        return AppError::new(ErrorCode::CannotFollowSelf, "you cannot follow yourself");
    }
    AppError::Database(err)
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards in the needle escaped.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn filtered_posts(filter: &PostFilter) -> posts::BoxedQuery<'static, Pg> {
    let mut query = posts::table.into_boxed();

    if let Some(title) = &filter.title {
        query = query.filter(posts::title.ilike(contains_pattern(title)));
    }
    if let Some(content) = &filter.content {
        query = query.filter(posts::content.ilike(contains_pattern(content)));
    }
    if let Some(author_id) = filter.author_id {
        query = query.filter(posts::author_id.eq(author_id));
    }
    if let Some(author_ids) = &filter.author_ids {
        query = query.filter(posts::author_id.eq_any(author_ids.clone()));
    }

    query
}

fn filtered_notifications(recipient_id: Uuid, unread_only: bool) -> notifications::BoxedQuery<'static, Pg> {
    let mut query = notifications::table
        .filter(notifications::recipient_id.eq(recipient_id))
        .into_boxed();
    if unread_only {
        query = query.filter(notifications::is_read.eq(false));
    }
    query
}

impl SocialRepo for PgRepo<'_> {
    // --- users ---

    fn insert_user(&mut self, new: &NewUser) -> AppResult<User> {
        diesel::insert_into(users::table)
            .values((users::id.eq(new_id()), new))
            .get_result::<User>(self.conn)
            .map_err(user_conflict)
    }

    fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(users::table.find(id).first::<User>(self.conn).optional()?)
    }

    fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        Ok(users::table
            .filter(users::username.eq(username))
            .first::<User>(self.conn)
            .optional()?)
    }

    fn find_users(&mut self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(users::table
            .filter(users::id.eq_any(ids.to_vec()))
            .load::<User>(self.conn)?)
    }

    fn update_user(&mut self, id: Uuid, changes: &UpdateUser) -> AppResult<User> {
        if changes.is_empty() {
            return Ok(users::table.find(id).first::<User>(self.conn)?);
        }
        diesel::update(users::table.find(id))
            .set((changes, users::updated_at.eq(Utc::now())))
            .get_result::<User>(self.conn)
            .map_err(user_conflict)
    }

    fn delete_user(&mut self, id: Uuid) -> AppResult<bool> {
        let deleted = diesel::delete(users::table.find(id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    // --- follow graph ---

    fn insert_follow(&mut self, new: &NewFollow) -> AppResult<bool> {
        let inserted = diesel::insert_into(follows::table)
            .values(new)
            .on_conflict_do_nothing()
            .execute(self.conn)
            .map_err(follow_violation)?;
        Ok(inserted == 1)
    }

    fn delete_follow(&mut self, follower_id: Uuid, following_id: Uuid) -> AppResult<bool> {
        let deleted = diesel::delete(
            follows::table
                .filter(follows::follower_id.eq(follower_id))
                .filter(follows::following_id.eq(following_id)),
        )
        .execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn follow_exists(&mut self, follower_id: Uuid, following_id: Uuid) -> AppResult<bool> {
        let count: i64 = follows::table
            .filter(follows::follower_id.eq(follower_id))
            .filter(follows::following_id.eq(following_id))
            .count()
            .get_result(self.conn)?;
        Ok(count > 0)
    }

    fn following_ids(&mut self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(follows::table
            .filter(follows::follower_id.eq(user_id))
            .select(follows::following_id)
            .load::<Uuid>(self.conn)?)
    }

    fn follow_counts(&mut self, user_id: Uuid) -> AppResult<(i64, i64)> {
        let followers: i64 = follows::table
            .filter(follows::following_id.eq(user_id))
            .count()
            .get_result(self.conn)?;
        let following: i64 = follows::table
            .filter(follows::follower_id.eq(user_id))
            .count()
            .get_result(self.conn)?;
        Ok((followers, following))
    }

    fn list_followers(&mut self, user_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)> {
        let total: i64 = follows::table
            .filter(follows::following_id.eq(user_id))
            .count()
            .get_result(self.conn)?;
        let ids = follows::table
            .filter(follows::following_id.eq(user_id))
            .order((follows::created_at.desc(), follows::follower_id.desc()))
            .select(follows::follower_id)
            .limit(page.limit)
            .offset(page.offset)
            .load::<Uuid>(self.conn)?;
        Ok((ids, total))
    }

    fn list_following(&mut self, user_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)> {
        let total: i64 = follows::table
            .filter(follows::follower_id.eq(user_id))
            .count()
            .get_result(self.conn)?;
        let ids = follows::table
            .filter(follows::follower_id.eq(user_id))
            .order((follows::created_at.desc(), follows::following_id.desc()))
            .select(follows::following_id)
            .limit(page.limit)
            .offset(page.offset)
            .load::<Uuid>(self.conn)?;
        Ok((ids, total))
    }

    // --- posts ---

    fn insert_post(&mut self, new: &NewPost) -> AppResult<Post> {
        Ok(diesel::insert_into(posts::table)
            .values((posts::id.eq(new_id()), new))
            .get_result::<Post>(self.conn)?)
    }

    fn find_post(&mut self, id: Uuid) -> AppResult<Option<Post>> {
        Ok(posts::table.find(id).first::<Post>(self.conn).optional()?)
    }

    fn update_post(&mut self, id: Uuid, changes: &UpdatePost) -> AppResult<Post> {
        if changes.is_empty() {
            return Ok(posts::table.find(id).first::<Post>(self.conn)?);
        }
        Ok(diesel::update(posts::table.find(id))
            .set((changes, posts::updated_at.eq(Utc::now())))
            .get_result::<Post>(self.conn)?)
    }

    fn delete_post(&mut self, id: Uuid) -> AppResult<bool> {
        let deleted = diesel::delete(posts::table.find(id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn list_posts(&mut self, filter: &PostFilter, page: PageRequest) -> AppResult<(Vec<Post>, i64)> {
        if matches!(&filter.author_ids, Some(ids) if ids.is_empty()) {
            return Ok((Vec::new(), 0));
        }

        let total: i64 = filtered_posts(filter).count().get_result(self.conn)?;
        let items = filtered_posts(filter)
            .order((posts::created_at.desc(), posts::id.desc()))
            .limit(page.limit)
            .offset(page.offset)
            .load::<Post>(self.conn)?;
        Ok((items, total))
    }

    fn post_ids_by_author(&mut self, author_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(posts::table
            .filter(posts::author_id.eq(author_id))
            .select(posts::id)
            .load::<Uuid>(self.conn)?)
    }

    // --- comments ---

    fn insert_comment(&mut self, new: &NewComment) -> AppResult<Comment> {
        Ok(diesel::insert_into(comments::table)
            .values((comments::id.eq(new_id()), new))
            .get_result::<Comment>(self.conn)?)
    }

    fn find_comment(&mut self, id: Uuid) -> AppResult<Option<Comment>> {
        Ok(comments::table.find(id).first::<Comment>(self.conn).optional()?)
    }

    fn update_comment(&mut self, id: Uuid, changes: &UpdateComment) -> AppResult<Comment> {
        if changes.content.is_none() {
            return Ok(comments::table.find(id).first::<Comment>(self.conn)?);
        }
        Ok(diesel::update(comments::table.find(id))
            .set((changes, comments::updated_at.eq(Utc::now())))
            .get_result::<Comment>(self.conn)?)
    }

    fn delete_comment(&mut self, id: Uuid) -> AppResult<bool> {
        let deleted = diesel::delete(comments::table.find(id)).execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn list_comments(&mut self, post_id: Uuid, page: PageRequest) -> AppResult<(Vec<Comment>, i64)> {
        let total: i64 = comments::table
            .filter(comments::post_id.eq(post_id))
            .count()
            .get_result(self.conn)?;
        let items = comments::table
            .filter(comments::post_id.eq(post_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .limit(page.limit)
            .offset(page.offset)
            .load::<Comment>(self.conn)?;
        Ok((items, total))
    }

    fn comment_counts(&mut self, post_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = comments::table
            .filter(comments::post_id.eq_any(post_ids.to_vec()))
            .group_by(comments::post_id)
            .select((comments::post_id, count(comments::id)))
            .load::<(Uuid, i64)>(self.conn)?;
        Ok(rows.into_iter().collect())
    }

    fn comment_ids_for_cleanup(&mut self, post_ids: &[Uuid], author_id: Option<Uuid>) -> AppResult<Vec<Uuid>> {
        let mut ids = Vec::new();
        if !post_ids.is_empty() {
            ids = comments::table
                .filter(comments::post_id.eq_any(post_ids.to_vec()))
                .select(comments::id)
                .load::<Uuid>(self.conn)?;
        }
        if let Some(author_id) = author_id {
            let own = comments::table
                .filter(comments::author_id.eq(author_id))
                .select(comments::id)
                .load::<Uuid>(self.conn)?;
            for id in own {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    // --- likes ---

    fn insert_like(&mut self, new: &NewLike) -> AppResult<Option<Like>> {
        // RETURNING yields no row when the pair already exists.
        Ok(diesel::insert_into(likes::table)
            .values((likes::id.eq(new_id()), new))
            .on_conflict_do_nothing()
            .get_result::<Like>(self.conn)
            .optional()?)
    }

    fn delete_like(&mut self, user_id: Uuid, post_id: Uuid) -> AppResult<bool> {
        let deleted = diesel::delete(
            likes::table
                .filter(likes::user_id.eq(user_id))
                .filter(likes::post_id.eq(post_id)),
        )
        .execute(self.conn)?;
        Ok(deleted > 0)
    }

    fn like_exists(&mut self, user_id: Uuid, post_id: Uuid) -> AppResult<bool> {
        let count: i64 = likes::table
            .filter(likes::user_id.eq(user_id))
            .filter(likes::post_id.eq(post_id))
            .count()
            .get_result(self.conn)?;
        Ok(count > 0)
    }

    fn count_likes(&mut self, post_id: Uuid) -> AppResult<i64> {
        Ok(likes::table
            .filter(likes::post_id.eq(post_id))
            .count()
            .get_result(self.conn)?)
    }

    fn like_counts(&mut self, post_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = likes::table
            .filter(likes::post_id.eq_any(post_ids.to_vec()))
            .group_by(likes::post_id)
            .select((likes::post_id, count(likes::id)))
            .load::<(Uuid, i64)>(self.conn)?;
        Ok(rows.into_iter().collect())
    }

    fn liked_post_ids(&mut self, user_id: Uuid, post_ids: &[Uuid]) -> AppResult<HashSet<Uuid>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids = likes::table
            .filter(likes::user_id.eq(user_id))
            .filter(likes::post_id.eq_any(post_ids.to_vec()))
            .select(likes::post_id)
            .load::<Uuid>(self.conn)?;
        Ok(ids.into_iter().collect())
    }

    fn list_likers(&mut self, post_id: Uuid, page: PageRequest) -> AppResult<(Vec<Uuid>, i64)> {
        let total = self.count_likes(post_id)?;
        let ids = likes::table
            .filter(likes::post_id.eq(post_id))
            .order((likes::created_at.desc(), likes::id.desc()))
            .select(likes::user_id)
            .limit(page.limit)
            .offset(page.offset)
            .load::<Uuid>(self.conn)?;
        Ok((ids, total))
    }

    // --- notifications ---

    fn insert_notification(&mut self, new: &NewNotification) -> AppResult<Notification> {
        let row = diesel::insert_into(notifications::table)
            .values((notifications::id.eq(new_id()), NewNotificationRow::from(new)))
            .get_result::<NotificationRow>(self.conn)?;
        Notification::try_from(row)
    }

    fn list_notifications(
        &mut self,
        recipient_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> AppResult<(Vec<Notification>, i64)> {
        let total: i64 = filtered_notifications(recipient_id, unread_only)
            .count()
            .get_result(self.conn)?;
        let rows = filtered_notifications(recipient_id, unread_only)
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .limit(page.limit)
            .offset(page.offset)
            .load::<NotificationRow>(self.conn)?;

        let items = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((items, total))
    }

    fn count_unread(&mut self, recipient_id: Uuid) -> AppResult<i64> {
        Ok(filtered_notifications(recipient_id, true)
            .count()
            .get_result(self.conn)?)
    }

    fn mark_read(&mut self, id: Uuid, recipient_id: Uuid) -> AppResult<Option<Notification>> {
        let row = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::recipient_id.eq(recipient_id)),
        )
        .set(notifications::is_read.eq(true))
        .get_result::<NotificationRow>(self.conn)
        .optional()?;

        row.map(Notification::try_from).transpose()
    }

    fn mark_all_read(&mut self, recipient_id: Uuid) -> AppResult<usize> {
        Ok(diesel::update(
            notifications::table
                .filter(notifications::recipient_id.eq(recipient_id))
                .filter(notifications::is_read.eq(false)),
        )
        .set(notifications::is_read.eq(true))
        .execute(self.conn)?)
    }

    fn delete_notifications_for(&mut self, targets: &[NotificationTarget]) -> AppResult<usize> {
        let mut deleted = 0;
        for kind in [NotificationTarget::POST_KIND, NotificationTarget::COMMENT_KIND] {
            let ids: Vec<Uuid> = targets
                .iter()
                .filter(|t| t.kind() == kind)
                .map(NotificationTarget::id)
                .collect();
            if ids.is_empty() {
                continue;
            }
            deleted += diesel::delete(
                notifications::table
                    .filter(notifications::target_kind.eq(kind))
                    .filter(notifications::target_id.eq_any(ids)),
            )
            .execute(self.conn)?;
        }
        Ok(deleted)
    }
}
