use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Telegram chat classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatType {
    /// Map the `type` string the Telegram API reports to a known variant.
    /// Unknown values fall back to `Private`.
    pub fn from_telegram(s: &str) -> Self {
        match s {
            "group" => ChatType::Group,
            "supergroup" => ChatType::Supergroup,
            "channel" => ChatType::Channel,
            _ => ChatType::Private,
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatType::Private => write!(f, "private"),
            ChatType::Group => write!(f, "group"),
            ChatType::Supergroup => write!(f, "supergroup"),
            ChatType::Channel => write!(f, "channel"),
        }
    }
}

/// A registered API client entitled to trigger notifications.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered delivery target on Telegram.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub id: Uuid,
    /// Telegram-assigned chat identifier; unique and immutable.
    pub telegram_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub chat_type: ChatType,
    pub label: Option<String>,
    pub description: Option<String>,
    pub is_tester: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Display label for client-facing summaries: title, else username,
    /// else a synthetic "Chat <id>".
    pub fn display_title(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        if let Some(username) = &self.username
            && !username.is_empty()
        {
            return username.clone();
        }
        format!("Chat {}", self.telegram_id)
    }
}

/// An immutable audit record of one attempted delivery.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryEvent {
    pub id: Uuid,
    pub service_id: Uuid,
    pub chat_id: Uuid,
    /// The exact formatted text that was transmitted.
    pub message_content: String,
    pub telegram_message_id: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Outcome of a single delivery attempt to one recipient.
///
/// Two variants with disjoint payloads: a confirmed delivery always carries
/// the platform message id, a failure always carries a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Delivered { message_id: i64 },
    Failed { error: String },
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn message_id(&self) -> Option<i64> {
        match self {
            DeliveryOutcome::Delivered { message_id } => Some(*message_id),
            DeliveryOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Failed { error } => Some(error),
        }
    }
}

/// A chat surfaced by the discovery sweep, not yet registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredChat {
    pub telegram_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub chat_type: ChatType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_chat(title: &str, username: Option<&str>) -> Chat {
        Chat {
            id: Uuid::new_v4(),
            telegram_id: 111,
            title: title.to_string(),
            username: username.map(str::to_string),
            chat_type: ChatType::Private,
            label: None,
            description: None,
            is_tester: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_title_prefers_title() {
        assert_eq!(make_chat("Ops", Some("ops_chat")).display_title(), "Ops");
    }

    #[test]
    fn test_display_title_falls_back_to_username() {
        assert_eq!(make_chat("", Some("ops_chat")).display_title(), "ops_chat");
    }

    #[test]
    fn test_display_title_synthesizes_from_id() {
        assert_eq!(make_chat("", None).display_title(), "Chat 111");
    }

    #[test]
    fn test_chat_type_from_telegram() {
        assert_eq!(ChatType::from_telegram("supergroup"), ChatType::Supergroup);
        assert_eq!(ChatType::from_telegram("channel"), ChatType::Channel);
        assert_eq!(ChatType::from_telegram("weird"), ChatType::Private);
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = DeliveryOutcome::Delivered { message_id: 42 };
        assert!(ok.is_success());
        assert_eq!(ok.message_id(), Some(42));
        assert_eq!(ok.error(), None);

        let failed = DeliveryOutcome::Failed {
            error: "bot was blocked".to_string(),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.message_id(), None);
        assert_eq!(failed.error(), Some("bot was blocked"));
    }
}
