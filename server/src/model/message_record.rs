use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::labels::Category;

/// A parsed sender or recipient address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email: String,
    pub name: Option<String>,
}

/// Attachment metadata collected from the MIME tree. Content is fetched
/// separately by attachment id when something downstream needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub attachment_id: String,
}

/// Content classification produced by the external classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub confidence: f32,
    pub intent: String,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub should_escalate: bool,
}

/// Job context carried on a campaign-reply link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContext {
    pub job_name: String,
    pub job_description: String,
    pub original_email_subject: String,
    pub original_email_body: String,
}

/// Link from an inbound reply back to the outbound campaign send that
/// started its thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignLink {
    pub is_campaign_reply: bool,
    pub job_id: Option<String>,
    pub task_id: Option<i64>,
    pub original_message_id: Option<String>,
    pub job_context: Option<JobContext>,
}

/// Persisted inbound message. Identity is `(mailbox_id, provider_message_id)`;
/// created once, updated in place as classification completes, never deleted
/// by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessageRecord {
    pub mailbox_id: String,
    pub provider_message_id: String,
    pub thread_id: String,
    pub from: EmailAddress,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub snippet: String,
    pub labels: Vec<String>,
    pub attachments: Vec<AttachmentMeta>,
    pub received_at: DateTime<Utc>,
    pub classification: Option<Classification>,
    pub correlation: Option<CampaignLink>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Sender flags resolved once per unique address per cycle. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    pub is_existing_client: bool,
    pub has_active_orders: bool,
}
