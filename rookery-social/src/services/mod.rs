pub mod account_service;
pub mod comment_service;
pub mod follow_service;
pub mod like_service;
pub mod notification_service;
pub mod permissions;
pub mod post_service;

use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use rookery_shared::errors::{AppError, AppResult, ErrorCode};

/// Run the derive validators and report failures per field.
pub(crate) fn validate_request<T: Validate>(req: &T) -> AppResult<()> {
    req.validate().map_err(|errors| {
        let mut details = Map::new();
        for (field, failures) in errors.field_errors() {
            let messages: Vec<Value> = failures
                .iter()
                .map(|f| match &f.message {
                    Some(message) => Value::String(message.to_string()),
                    None => Value::String(f.code.to_string()),
                })
                .collect();
            details.insert(field.to_string(), Value::Array(messages));
        }
        AppError::with_details(ErrorCode::ValidationError, "invalid input", Value::Object(details))
    })
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("this field may not be blank".into());
        return Err(err);
    }
    Ok(())
}
