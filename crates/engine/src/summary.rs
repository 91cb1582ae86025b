//! Response aggregator: reduce a dispatch batch into one client-facing
//! summary.

use serde::{Deserialize, Serialize};

use herald_common::types::{Chat, DeliveryOutcome};

/// Per-recipient detail line in the notify response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientReport {
    /// Telegram chat id of the recipient
    pub chat_id: i64,
    pub chat_title: String,
    pub success: bool,
    pub message_id: Option<i64>,
    pub error: Option<String>,
}

/// Aggregated result of one notify call.
///
/// `success` reflects that the dispatch was executed, not that every
/// delivery landed: a call that reaches 3 of 5 recipients is not itself an
/// error, callers read the embedded counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub success: bool,
    pub message: String,
    pub recipient_count: usize,
    pub successful_sends: usize,
    pub failed_sends: usize,
    pub responses: Vec<RecipientReport>,
}

impl DispatchSummary {
    /// Pure reduction over (chat, outcome) pairs, in snapshot order.
    pub fn from_results(chats: &[Chat], outcomes: &[DeliveryOutcome]) -> Self {
        let responses: Vec<RecipientReport> = chats
            .iter()
            .zip(outcomes)
            .map(|(chat, outcome)| RecipientReport {
                chat_id: chat.telegram_id,
                chat_title: chat.display_title(),
                success: outcome.is_success(),
                message_id: outcome.message_id(),
                error: outcome.error().map(str::to_string),
            })
            .collect();

        let successful_sends = responses.iter().filter(|r| r.success).count();
        let failed_sends = responses.len() - successful_sends;

        Self {
            success: true,
            message: "Notification sent successfully".to_string(),
            recipient_count: responses.len(),
            successful_sends,
            failed_sends,
            responses,
        }
    }
}
