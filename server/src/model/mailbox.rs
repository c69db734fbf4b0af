use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth credential for one connected mailbox.
///
/// Mutated only by a successful token refresh or an admin reconnection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConnection {
    pub mailbox_id: String,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-mailbox ingestion watermark and sync policy.
///
/// Advanced exactly once per completed poll cycle, never rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub mailbox_id: String,
    pub enabled: bool,
    pub auto_process: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_message_received_at: Option<DateTime<Utc>>,
    pub total_messages_synced: u64,
}

impl SyncState {
    pub fn new(mailbox_id: impl Into<String>) -> Self {
        SyncState {
            mailbox_id: mailbox_id.into(),
            enabled: true,
            auto_process: true,
            last_sync_at: None,
            last_message_received_at: None,
            total_messages_synced: 0,
        }
    }
}

/// Cursor update applied at the end of a cycle.
#[derive(Debug, Clone)]
pub struct CursorAdvance {
    pub last_sync_at: DateTime<Utc>,
    /// Max `received_at` observed in the batch; `None` leaves the stored
    /// watermark untouched (empty cycle).
    pub last_message_received_at: Option<DateTime<Utc>>,
    pub newly_synced: u64,
}
