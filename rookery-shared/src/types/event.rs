use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain event envelope published to the broker.
///
/// Routing key format: `rookery.{service}.{entity}.{action}`
/// Example: `rookery.social.post.liked`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

pub mod routing_keys {
    pub const USER_REGISTERED: &str = "rookery.social.user.registered";
    pub const FOLLOW_CREATED: &str = "rookery.social.follow.created";
    pub const FOLLOW_REMOVED: &str = "rookery.social.follow.removed";
    pub const POST_CREATED: &str = "rookery.social.post.created";
    pub const POST_LIKED: &str = "rookery.social.post.liked";
    pub const COMMENT_CREATED: &str = "rookery.social.comment.created";
}

pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserRegistered {
        pub user_id: Uuid,
        pub username: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FollowChanged {
        pub follower_id: Uuid,
        pub following_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostCreated {
        pub post_id: Uuid,
        pub author_id: Uuid,
        pub title: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PostLiked {
        pub post_id: Uuid,
        pub liker_id: Uuid,
        pub author_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CommentCreated {
        pub comment_id: Uuid,
        pub post_id: Uuid,
        pub author_id: Uuid,
        pub content_preview: String,
    }
}
