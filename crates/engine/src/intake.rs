//! Request validation and authorization for the notify endpoint.
//!
//! Ordering matters: the payload is validated before the credential is
//! looked at, so a malformed body is a 400 even when the API key is also
//! missing. All of this is read-only;
//! nothing here leaves a side effect behind.

use sqlx::PgPool;

use herald_common::error::AppError;
use herald_common::types::{Chat, Service};

use crate::services::ServiceRegistry;

/// Reject requests that do not declare a JSON body.
///
/// The body is only parsed as JSON when the caller says it is JSON; a
/// `text/plain` body that happens to contain valid JSON is still a 400.
pub fn ensure_json_content_type(content_type: Option<&str>) -> Result<(), AppError> {
    let declared_json = content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));

    if !declared_json {
        return Err(AppError::Validation("Invalid request format".to_string()));
    }
    Ok(())
}

/// Parse the notify request body and extract the trimmed message text.
pub fn parse_notify_payload(body: &[u8]) -> Result<String, AppError> {
    if body.is_empty() {
        return Err(AppError::Validation(
            "Missing JSON in request body".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| AppError::Validation("Invalid JSON in request body".to_string()))?;

    if value.is_null() {
        return Err(AppError::Validation(
            "Missing JSON in request body".to_string(),
        ));
    }

    let message = value
        .get("message")
        .ok_or_else(|| AppError::Validation("Missing message in request body".to_string()))?;

    let message = message
        .as_str()
        .ok_or_else(|| AppError::Validation("Invalid request format".to_string()))?;

    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Resolve the calling service from the presented API key.
pub async fn resolve_service(pool: &PgPool, api_key: Option<&str>) -> Result<Service, AppError> {
    let api_key = match api_key {
        Some(key) if !key.is_empty() => key,
        _ => return Err(AppError::MissingApiKey),
    };

    ServiceRegistry::find_by_api_key(pool, api_key)
        .await?
        .ok_or(AppError::InvalidApiKey)
}

/// Snapshot the service's authorized chats.
///
/// The returned set is fixed for the lifetime of the dispatch; concurrent
/// admin edits to the links affect only later requests.
pub async fn authorized_chats(pool: &PgPool, service: &Service) -> Result<Vec<Chat>, AppError> {
    let chats = ServiceRegistry::authorized_chats(pool, service.id).await?;
    if chats.is_empty() {
        tracing::warn!(service = %service.name, "Service has no authorized chats");
        return Err(AppError::NoRecipients);
    }
    Ok(chats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_message(result: Result<String, AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_content_type_accepted() {
        assert!(ensure_json_content_type(Some("application/json")).is_ok());
        assert!(ensure_json_content_type(Some("application/json; charset=utf-8")).is_ok());
        assert!(ensure_json_content_type(Some("Application/JSON")).is_ok());
    }

    #[test]
    fn test_undeclared_json_rejected() {
        for content_type in [None, Some("text/plain"), Some("application/x-www-form-urlencoded")] {
            let msg = match ensure_json_content_type(content_type) {
                Err(AppError::Validation(msg)) => msg,
                other => panic!("expected validation error, got {other:?}"),
            };
            assert_eq!(msg, "Invalid request format");
        }
    }

    #[test]
    fn test_valid_payload_is_trimmed() {
        let message = parse_notify_payload(br#"{"message": "  Server is down  "}"#).unwrap();
        assert_eq!(message, "Server is down");
    }

    #[test]
    fn test_empty_body_rejected() {
        let msg = validation_message(parse_notify_payload(b""));
        assert_eq!(msg, "Missing JSON in request body");
    }

    #[test]
    fn test_invalid_json_rejected() {
        let msg = validation_message(parse_notify_payload(b"{not json"));
        assert_eq!(msg, "Invalid JSON in request body");
    }

    #[test]
    fn test_null_body_rejected() {
        let msg = validation_message(parse_notify_payload(b"null"));
        assert_eq!(msg, "Missing JSON in request body");
    }

    #[test]
    fn test_missing_message_rejected() {
        let msg = validation_message(parse_notify_payload(b"{}"));
        assert_eq!(msg, "Missing message in request body");
    }

    #[test]
    fn test_non_string_message_rejected() {
        let msg = validation_message(parse_notify_payload(br#"{"message": 42}"#));
        assert_eq!(msg, "Invalid request format");
    }

    #[test]
    fn test_whitespace_only_message_rejected() {
        let msg = validation_message(parse_notify_payload(br#"{"message": "   "}"#));
        assert_eq!(msg, "Message cannot be empty");
    }
}
