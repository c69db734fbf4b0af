//! In-memory store backends. Default wiring for the dev server and the
//! fixture of choice for the pipeline tests.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::{
    card::ActionCard,
    mailbox::{CursorAdvance, MailboxConnection, SyncState},
    message_record::{CampaignLink, Classification, InboundMessageRecord},
};

use super::{
    CardStore, ContactDirectory, ContactProfile, CredentialStore, JobStore, JobSummary,
    MessageStore, SyncStateStore,
};

#[derive(Default)]
pub struct MemoryCredentialStore {
    connections: RwLock<HashMap<String, MailboxConnection>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn put(&self, conn: MailboxConnection) {
        self.connections
            .write()
            .await
            .insert(conn.mailbox_id.clone(), conn);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load_connection(
        &self,
        mailbox_id: &str,
    ) -> anyhow::Result<Option<MailboxConnection>> {
        Ok(self.connections.read().await.get(mailbox_id).cloned())
    }

    async fn update_access_token(
        &self,
        mailbox_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut connections = self.connections.write().await;
        let conn = connections
            .get_mut(mailbox_id)
            .ok_or_else(|| anyhow!("mailbox {} is not connected", mailbox_id))?;
        conn.access_token = access_token.to_string();
        conn.expires_at = expires_at;
        conn.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySyncStateStore {
    states: RwLock<HashMap<String, SyncState>>,
}

impl MemorySyncStateStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn put(&self, state: SyncState) {
        self.states
            .write()
            .await
            .insert(state.mailbox_id.clone(), state);
    }
}

#[async_trait]
impl SyncStateStore for MemorySyncStateStore {
    async fn get(&self, mailbox_id: &str) -> anyhow::Result<Option<SyncState>> {
        Ok(self.states.read().await.get(mailbox_id).cloned())
    }

    async fn advance(&self, mailbox_id: &str, update: CursorAdvance) -> anyhow::Result<()> {
        let mut states = self.states.write().await;
        let state = states
            .get_mut(mailbox_id)
            .ok_or_else(|| anyhow!("no sync state for mailbox {}", mailbox_id))?;
        state.last_sync_at = Some(update.last_sync_at);
        if let Some(received_at) = update.last_message_received_at {
            state.last_message_received_at = Some(received_at);
        }
        state.total_messages_synced += update.newly_synced;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    records: RwLock<HashMap<(String, String), InboundMessageRecord>>,
}

impl MemoryMessageStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn find(
        &self,
        mailbox_id: &str,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<InboundMessageRecord>> {
        let key = (mailbox_id.to_string(), provider_message_id.to_string());
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn insert(&self, record: &InboundMessageRecord) -> anyhow::Result<()> {
        let key = (
            record.mailbox_id.clone(),
            record.provider_message_id.clone(),
        );
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(anyhow!(
                "duplicate message record for ({}, {})",
                key.0,
                key.1
            ));
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn record_classification(
        &self,
        mailbox_id: &str,
        provider_message_id: &str,
        classification: &Classification,
        correlation: Option<&CampaignLink>,
        processed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let key = (mailbox_id.to_string(), provider_message_id.to_string());
        let mut records = self.records.write().await;
        let record = records.get_mut(&key).ok_or_else(|| {
            anyhow!("no message record for ({}, {})", key.0, key.1)
        })?;
        record.classification = Some(classification.clone());
        record.correlation = correlation.cloned();
        record.processed_at = Some(processed_at);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCardStore {
    cards: RwLock<Vec<ActionCard>>,
}

impl MemoryCardStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn all(&self) -> Vec<ActionCard> {
        self.cards.read().await.clone()
    }

    pub async fn push(&self, card: ActionCard) {
        self.cards.write().await.push(card);
    }
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn insert(&self, card: &ActionCard) -> anyhow::Result<()> {
        self.cards.write().await.push(card.clone());
        Ok(())
    }

    async fn find_latest_executed_send(
        &self,
        thread_id: &str,
    ) -> anyhow::Result<Option<ActionCard>> {
        let cards = self.cards.read().await;
        Ok(cards
            .iter()
            .filter(|c| c.thread_id == thread_id && c.is_executed_send())
            .max_by_key(|c| c.executed_at)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryContactDirectory {
    contacts: RwLock<HashMap<String, ContactProfile>>,
}

impl MemoryContactDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn put(&self, email: &str, profile: ContactProfile) {
        self.contacts
            .write()
            .await
            .insert(email.to_ascii_lowercase(), profile);
    }
}

#[async_trait]
impl ContactDirectory for MemoryContactDirectory {
    async fn lookup(&self, email: &str) -> anyhow::Result<Option<ContactProfile>> {
        Ok(self
            .contacts
            .read()
            .await
            .get(&email.to_ascii_lowercase())
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobSummary>>,
}

impl MemoryJobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn put(&self, job_id: &str, job: JobSummary) {
        self.jobs.write().await.insert(job_id.to_string(), job);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, job_id: &str) -> anyhow::Result<Option<JobSummary>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }
}
