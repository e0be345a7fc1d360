//! Building blocks shared by Rookery services: the error envelope, auth
//! extractors, pagination, event envelopes and infrastructure clients.

pub mod clients;
pub mod errors;
pub mod middleware;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use types::*;
