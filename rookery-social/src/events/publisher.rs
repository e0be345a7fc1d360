use serde::Serialize;
use uuid::Uuid;

use rookery_shared::clients::rabbitmq::RabbitMQClient;
use rookery_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "rookery-social";
const PREVIEW_CHARS: usize = 80;

/// Publish after commit. Broker failures are logged and never reach the caller.
async fn publish<T: Serialize>(rabbitmq: Option<&RabbitMQClient>, routing_key: &str, event: Event<T>) {
    let Some(rabbitmq) = rabbitmq else {
        return;
    };
    if let Err(e) = rabbitmq.publish(routing_key, &event).await {
        tracing::error!(error = %e, routing_key = %routing_key, "failed to publish event");
    }
}

pub async fn publish_user_registered(rabbitmq: Option<&RabbitMQClient>, user_id: Uuid, username: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_REGISTERED,
        payloads::UserRegistered {
            user_id,
            username: username.to_string(),
        },
    )
    .with_user(user_id);

    publish(rabbitmq, routing_keys::USER_REGISTERED, event).await;
}

pub async fn publish_follow_created(rabbitmq: Option<&RabbitMQClient>, follower_id: Uuid, following_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::FOLLOW_CREATED,
        payloads::FollowChanged {
            follower_id,
            following_id,
        },
    )
    .with_user(follower_id);

    publish(rabbitmq, routing_keys::FOLLOW_CREATED, event).await;
}

pub async fn publish_follow_removed(rabbitmq: Option<&RabbitMQClient>, follower_id: Uuid, following_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::FOLLOW_REMOVED,
        payloads::FollowChanged {
            follower_id,
            following_id,
        },
    )
    .with_user(follower_id);

    publish(rabbitmq, routing_keys::FOLLOW_REMOVED, event).await;
}

pub async fn publish_post_created(rabbitmq: Option<&RabbitMQClient>, post_id: Uuid, author_id: Uuid, title: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::POST_CREATED,
        payloads::PostCreated {
            post_id,
            author_id,
            title: title.to_string(),
        },
    )
    .with_user(author_id);

    publish(rabbitmq, routing_keys::POST_CREATED, event).await;
}

pub async fn publish_post_liked(rabbitmq: Option<&RabbitMQClient>, post_id: Uuid, liker_id: Uuid, author_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::POST_LIKED,
        payloads::PostLiked {
            post_id,
            liker_id,
            author_id,
        },
    )
    .with_user(liker_id);

    publish(rabbitmq, routing_keys::POST_LIKED, event).await;
}

pub async fn publish_comment_created(
    rabbitmq: Option<&RabbitMQClient>,
    comment_id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    content: &str,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::COMMENT_CREATED,
        payloads::CommentCreated {
            comment_id,
            post_id,
            author_id,
            content_preview: preview(content),
        },
    )
    .with_user(author_id);

    publish(rabbitmq, routing_keys::COMMENT_CREATED, event).await;
}

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let long = "é".repeat(200);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn publishing_without_a_broker_is_a_no_op() {
        publish_post_liked(None, Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()).await;
    }
}
