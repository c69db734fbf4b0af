//! Persistence seams consumed by the pipeline.
//!
//! The pipeline owns the semantics (idempotency key, cursor advancement,
//! correlation ordering); backends own the storage. `memory` provides the
//! default backend used by the dev server and the test suite.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    card::ActionCard,
    mailbox::{CursorAdvance, MailboxConnection, SyncState},
    message_record::{CampaignLink, Classification, InboundMessageRecord},
};

/// Read/write access to stored mailbox OAuth credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load_connection(&self, mailbox_id: &str)
        -> anyhow::Result<Option<MailboxConnection>>;

    /// Persist a refreshed access token. Exactly one call per successful
    /// refresh.
    async fn update_access_token(
        &self,
        mailbox_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Per-mailbox sync policy and ingestion watermark.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn get(&self, mailbox_id: &str) -> anyhow::Result<Option<SyncState>>;

    /// Apply the end-of-cycle cursor update. Never rolls the watermark back.
    async fn advance(&self, mailbox_id: &str, update: CursorAdvance) -> anyhow::Result<()>;
}

/// Store of ingested inbound messages, keyed by
/// `(mailbox_id, provider_message_id)`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn find(
        &self,
        mailbox_id: &str,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<InboundMessageRecord>>;

    /// Insert a new record. Fails on a duplicate identity rather than
    /// overwriting.
    async fn insert(&self, record: &InboundMessageRecord) -> anyhow::Result<()>;

    /// Attach classification and correlation to an already persisted record.
    async fn record_classification(
        &self,
        mailbox_id: &str,
        provider_message_id: &str,
        classification: &Classification,
        correlation: Option<&CampaignLink>,
        processed_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Store of action cards.
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn insert(&self, card: &ActionCard) -> anyhow::Result<()>;

    /// The most recently executed outbound send on a thread, if any.
    /// Tie-break between multiple sends is latest `executed_at`.
    async fn find_latest_executed_send(
        &self,
        thread_id: &str,
    ) -> anyhow::Result<Option<ActionCard>>;
}

/// Resolved contact flags for a sender address.
#[derive(Debug, Clone, Default)]
pub struct ContactProfile {
    pub client_id: Option<String>,
    pub has_active_orders: bool,
}

/// CRM contact lookup, consumed by the context builder.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn lookup(&self, email: &str) -> anyhow::Result<Option<ContactProfile>>;
}

/// Campaign job metadata used to build reply context.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub name: String,
    pub description: String,
}

/// Job lookup, consumed by the correlator.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, job_id: &str) -> anyhow::Result<Option<JobSummary>>;
}
