pub mod accounts;
pub mod comments;
pub mod health;
pub mod likes;
pub mod notifications;
pub mod posts;
pub mod users;
