//! Telegram Bot API transport.
//!
//! One outbound call per recipient. Every code path of `send_message`
//! resolves to a `DeliveryOutcome` value, so a transport failure for one chat
//! must never abort the surrounding dispatch.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use herald_common::types::{ChatType, DeliveryOutcome, DiscoveredChat};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Boundary trait between the dispatch engine and the messaging platform.
///
/// `send_message` is infallible by contract; `discover_chats` backs the
/// admin-only registration sweep and may fail loudly.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> DeliveryOutcome;
    async fn discover_chats(&self) -> Result<Vec<DiscoveredChat>, TransportError>;
}

/// Transport backed by the real Telegram Bot API.
pub struct TelegramTransport {
    client: Client,
    bot_token: String,
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram wraps every response in `{ok, description?, result?}`.
#[derive(Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Deserialize)]
struct Update {
    message: Option<UpdateMessage>,
    edited_message: Option<UpdateMessage>,
    channel_post: Option<UpdateMessage>,
}

#[derive(Deserialize)]
struct UpdateMessage {
    chat: UpdateChat,
}

#[derive(Deserialize)]
struct UpdateChat {
    id: i64,
}

#[derive(Deserialize)]
struct ChatInfo {
    title: Option<String>,
    first_name: Option<String>,
    username: Option<String>,
    #[serde(rename = "type")]
    chat_type: Option<String>,
}

impl TelegramTransport {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: Client::new(),
            bot_token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// Map a sendMessage HTTP response to a delivery outcome.
    fn map_send_response(status: StatusCode, body: &[u8]) -> DeliveryOutcome {
        // Telegram reports application errors (blocked, not found, ...) with
        // a non-2xx status AND an ok:false envelope; prefer its description.
        match serde_json::from_slice::<ApiEnvelope<SentMessage>>(body) {
            Ok(envelope) if envelope.ok => match envelope.result {
                Some(sent) => DeliveryOutcome::Delivered {
                    message_id: sent.message_id,
                },
                None => DeliveryOutcome::Failed {
                    error: "malformed response from Telegram API".to_string(),
                },
            },
            Ok(envelope) => DeliveryOutcome::Failed {
                error: envelope
                    .description
                    .unwrap_or_else(|| format!("Telegram API error (HTTP {})", status.as_u16())),
            },
            Err(_) if !status.is_success() => DeliveryOutcome::Failed {
                error: format!("HTTP {}", status.as_u16()),
            },
            Err(_) => DeliveryOutcome::Failed {
                error: "malformed response from Telegram API".to_string(),
            },
        }
    }

    fn map_network_error(err: reqwest::Error) -> DeliveryOutcome {
        let error = if err.is_timeout() {
            "request to Telegram API timed out".to_string()
        } else if err.is_connect() {
            "failed to connect to Telegram API".to_string()
        } else {
            format!("network error: {err}")
        };
        DeliveryOutcome::Failed { error }
    }

    async fn chat_profile(&self, chat_id: i64) -> Result<Option<DiscoveredChat>, TransportError> {
        let response = self
            .client
            .post(self.method_url("getChat"))
            .json(&serde_json::json!({ "chat_id": chat_id }))
            .send()
            .await?;

        let envelope: ApiEnvelope<ChatInfo> = response.json().await?;
        if !envelope.ok {
            tracing::warn!(
                chat_id,
                description = envelope.description.as_deref().unwrap_or("unknown"),
                "getChat failed, skipping chat"
            );
            return Ok(None);
        }

        let Some(info) = envelope.result else {
            return Ok(None);
        };

        let title = info
            .title
            .or(info.first_name)
            .or_else(|| info.username.clone())
            .unwrap_or_default();

        Ok(Some(DiscoveredChat {
            telegram_id: chat_id,
            title,
            username: info.username,
            chat_type: ChatType::from_telegram(info.chat_type.as_deref().unwrap_or("private")),
        }))
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> DeliveryOutcome {
        let payload = SendMessagePayload {
            chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = match self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Self::map_network_error(err),
        };

        let status = response.status();
        match response.bytes().await {
            Ok(body) => Self::map_send_response(status, &body),
            Err(err) => Self::map_network_error(err),
        }
    }

    /// Sweep recent bot updates for chats not yet registered.
    ///
    /// The Bot API has no "list my chats" call, so this only sees chats
    /// with recent interactions in the getUpdates window.
    async fn discover_chats(&self) -> Result<Vec<DiscoveredChat>, TransportError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .send()
            .await?;

        let envelope: ApiEnvelope<Vec<Update>> = response.json().await?;
        if !envelope.ok {
            return Err(TransportError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| "getUpdates failed".to_string()),
            ));
        }

        let updates = envelope.result.unwrap_or_default();
        let mut seen = HashSet::new();
        let mut chat_ids = Vec::new();
        for update in &updates {
            for message in [&update.message, &update.edited_message, &update.channel_post]
                .into_iter()
                .flatten()
            {
                if seen.insert(message.chat.id) {
                    chat_ids.push(message.chat.id);
                }
            }
        }

        tracing::debug!(
            updates = updates.len(),
            chats = chat_ids.len(),
            "Discovery sweep collected chat ids"
        );

        let mut discovered = Vec::with_capacity(chat_ids.len());
        for chat_id in chat_ids {
            if let Some(profile) = self.chat_profile(chat_id).await? {
                discovered.push(profile);
            }
        }

        Ok(discovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_send_maps_to_delivered() {
        let body = br#"{"ok": true, "result": {"message_id": 77, "date": 1}}"#;
        let outcome = TelegramTransport::map_send_response(StatusCode::OK, body);
        assert_eq!(outcome, DeliveryOutcome::Delivered { message_id: 77 });
    }

    #[test]
    fn test_api_error_uses_platform_description() {
        let body = br#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let outcome = TelegramTransport::map_send_response(StatusCode::FORBIDDEN, body);
        assert_eq!(
            outcome.error(),
            Some("Forbidden: bot was blocked by the user")
        );
    }

    #[test]
    fn test_non_success_status_without_envelope() {
        let outcome =
            TelegramTransport::map_send_response(StatusCode::BAD_GATEWAY, b"<html>oops</html>");
        assert_eq!(outcome.error(), Some("HTTP 502"));
    }

    #[test]
    fn test_malformed_success_body() {
        let outcome = TelegramTransport::map_send_response(StatusCode::OK, b"not json");
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("malformed response from Telegram API"));
    }

    #[test]
    fn test_ok_envelope_without_result_is_failure() {
        let outcome = TelegramTransport::map_send_response(StatusCode::OK, br#"{"ok": true}"#);
        assert!(!outcome.is_success());
    }
}
