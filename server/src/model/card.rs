use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::labels::Category;

/// Action item types the card factory can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    SendEmail,
    ScheduleCall,
    Research,
    CreateTask,
    FollowUp,
    CreateDeal,
}

/// Lifecycle state of an action card. Ingestion only ever originates
/// `Pending -> Approved` (auto-execute) or `Pending -> NeedsReview`;
/// later transitions belong to the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    Pending,
    NeedsReview,
    Approved,
    Done,
    Rejected,
}

/// Work item created from a classified inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCard {
    pub id: Uuid,
    pub mailbox_id: String,
    pub card_type: CardType,
    pub state: CardState,
    pub auto_execute: bool,
    /// Provider message id of the inbound message this card was made from.
    pub source_message_id: String,
    pub thread_id: String,
    pub category: Option<Category>,
    pub title: String,
    pub job_id: Option<String>,
    pub task_id: Option<i64>,
    pub action_payload: serde_json::Value,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ActionCard {
    /// An executed outbound send that can anchor campaign correlation.
    pub fn is_executed_send(&self) -> bool {
        self.card_type == CardType::SendEmail
            && self.state == CardState::Done
            && self.executed_at.is_some()
    }
}
