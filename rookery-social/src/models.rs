use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rookery_shared::errors::{AppError, AppResult};
use rookery_shared::types::auth::UserRole;

use crate::schema::{comments, follows, likes, notifications, posts, users};

// --- User ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub role: String,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Unknown role strings degrade to the least privileged role.
    pub fn role(&self) -> UserRole {
        self.role.parse::<UserRole>().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
            && self.role.is_none()
    }
}

// --- Follow ---

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = follows)]
pub struct Follow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = follows)]
pub struct NewFollow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
}

// --- Post ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = posts)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl UpdatePost {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Optional filters for post listings. Text filters are case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author_id: Option<Uuid>,
    /// Restrict to these authors (the feed). An empty list matches nothing.
    pub author_ids: Option<Vec<Uuid>>,
}

// --- Comment ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = comments)]
pub struct UpdateComment {
    pub content: Option<String>,
}

// --- Like ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub user_id: Uuid,
    pub post_id: Uuid,
}

// --- Notification ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Follow,
    Like,
    Comment,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Follow => "follow",
            Verb::Like => "like",
            Verb::Comment => "comment",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Verb::Follow => "New Follower",
            Verb::Like => "Post Like",
            Verb::Comment => "New Comment",
        }
    }
}

impl std::str::FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(Verb::Follow),
            "like" => Ok(Verb::Like),
            "comment" => Ok(Verb::Comment),
            _ => Err(format!("unknown notification verb: {s}")),
        }
    }
}

/// What a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum NotificationTarget {
    Post(Uuid),
    Comment(Uuid),
}

impl NotificationTarget {
    pub const POST_KIND: &'static str = "post";
    pub const COMMENT_KIND: &'static str = "comment";

    pub fn kind(&self) -> &'static str {
        match self {
            NotificationTarget::Post(_) => Self::POST_KIND,
            NotificationTarget::Comment(_) => Self::COMMENT_KIND,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            NotificationTarget::Post(id) | NotificationTarget::Comment(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            Self::POST_KIND => Some(NotificationTarget::Post(id)),
            Self::COMMENT_KIND => Some(NotificationTarget::Comment(id)),
            _ => None,
        }
    }
}

/// Storage shape of a notification; the target is split into two nullable columns.
#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = notifications)]
pub struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub verb: String,
    pub target_kind: Option<String>,
    pub target_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub verb: Verb,
    pub target: Option<NotificationTarget>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> AppResult<Self> {
        let verb = row.verb.parse::<Verb>().map_err(AppError::internal)?;
        let target = match (row.target_kind.as_deref(), row.target_id) {
            (Some(kind), Some(id)) => Some(
                NotificationTarget::from_parts(kind, id)
                    .ok_or_else(|| AppError::internal(format!("unknown notification target kind: {kind}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            recipient_id: row.recipient_id,
            actor_id: row.actor_id,
            verb,
            target,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub verb: Verb,
    pub target: Option<NotificationTarget>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotificationRow {
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub verb: &'static str,
    pub target_kind: Option<&'static str>,
    pub target_id: Option<Uuid>,
}

impl From<&NewNotification> for NewNotificationRow {
    fn from(n: &NewNotification) -> Self {
        Self {
            recipient_id: n.recipient_id,
            actor_id: n.actor_id,
            verb: n.verb.as_str(),
            target_kind: n.target.map(|t| t.kind()),
            target_id: n.target.map(|t| t.id()),
        }
    }
}
