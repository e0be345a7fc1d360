//! Social graph service: accounts, follows, posts, comments, likes and
//! notifications behind a JSON API.

pub mod auth;
pub mod config;
pub mod events;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;
pub mod views;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{middleware, Extension, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use rookery_shared::clients::rabbitmq::RabbitMQClient;
use rookery_shared::middleware::metrics_middleware;
use rookery_shared::types::auth::JwtKeys;

use store::Store;

pub struct AppState {
    pub store: Store,
    pub rabbitmq: Option<RabbitMQClient>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store, rabbitmq: None, metrics_handle: None }
    }
}

/// Every API route. CORS is left to the caller.
pub fn build_router(state: Arc<AppState>, keys: JwtKeys) -> Router {
    use routes::{accounts, comments, health, likes, notifications, posts, users};

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Accounts
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/login", post(accounts::login))
        .route(
            "/accounts/profile",
            get(accounts::get_profile)
                .patch(accounts::update_profile)
                .delete(accounts::delete_account),
        )
        // Users and the follow graph
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/follow", post(users::follow))
        .route("/users/:id/unfollow", post(users::unfollow))
        .route("/users/:id/followers", get(users::list_followers))
        .route("/users/:id/following", get(users::list_following))
        .route("/users/:id/role", put(users::set_role))
        // Posts
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:id",
            get(posts::get_post).patch(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/:id/comments", get(comments::list_comments).post(comments::add_comment))
        .route(
            "/posts/:id/comments/:comment_id",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/posts/:id/like", post(likes::toggle_like))
        .route("/posts/:id/likes", get(likes::list_likes))
        .route("/feed", get(posts::feed))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/mark-all-read", post(notifications::mark_all_read))
        .route("/notifications/:id/mark-read", post(notifications::mark_read))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(Extension(keys))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
