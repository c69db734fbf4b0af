//! Shared fixtures for pipeline tests: an in-memory mailbox, a scripted
//! classifier, a static token exchange, and a fully wired pipeline harness.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::{
        oauth::{OauthError, OauthResult, RefreshTokenExchange, RefreshTokenResponse},
        token_manager::TokenManager,
    },
    cards::DefaultCardFactory,
    email::{message::InboundMessage, outbound::OutboundReply, Mailbox, MailboxConnector},
    model::{
        card::{ActionCard, CardState, CardType},
        labels::Category,
        mailbox::{MailboxConnection, SyncState},
        message_record::{CampaignLink, Classification, ContextSnapshot, EmailAddress},
    },
    pipeline::{
        collaborators::{Classifier, ClassifyRequest, NotificationSender},
        context::ContextBuilder,
        correlator::CampaignCorrelator,
        curator::InboxCurator,
        orchestrator::MailboxPipeline,
    },
    store::memory::{
        MemoryCardStore, MemoryContactDirectory, MemoryCredentialStore, MemoryJobStore,
        MemoryMessageStore, MemorySyncStateStore,
    },
};

pub const MAILBOX_ID: &str = "mb1";

/// In-memory stand-in for the provider mailbox. Listing intentionally
/// returns every seeded id regardless of `since`: provider search windows
/// overlap in practice, which is exactly why the pipeline dedupes by id.
#[derive(Default)]
pub struct FakeMailbox {
    pub inbox: Mutex<Vec<InboundMessage>>,
    pub labels: Mutex<HashMap<String, BTreeSet<String>>>,
    pub fail_fetch: Mutex<HashSet<String>>,
    pub unparsable: Mutex<HashSet<String>>,
    pub listed_since: Mutex<Vec<DateTime<Utc>>>,
    pub sent_replies: Mutex<Vec<OutboundReply>>,
}

impl FakeMailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, message: InboundMessage) {
        self.labels.lock().unwrap().insert(
            message.id.clone(),
            BTreeSet::from(["INBOX".to_string(), "UNREAD".to_string()]),
        );
        self.inbox.lock().unwrap().push(message);
    }

    pub fn labels_of(&self, message_id: &str) -> BTreeSet<String> {
        self.labels
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_new_message_ids(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<String>> {
        self.listed_since.lock().unwrap().push(since);
        Ok(self
            .inbox
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.id.clone())
            .collect())
    }

    async fn fetch_message(&self, message_id: &str) -> anyhow::Result<Option<InboundMessage>> {
        if self.fail_fetch.lock().unwrap().contains(message_id) {
            return Err(anyhow!("simulated fetch failure for {}", message_id));
        }
        if self.unparsable.lock().unwrap().contains(message_id) {
            return Ok(None);
        }
        let found = self
            .inbox
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == message_id)
            .cloned();
        found
            .map(Some)
            .ok_or_else(|| anyhow!("no such message {}", message_id))
    }

    async fn send_reply(&self, reply: &OutboundReply) -> anyhow::Result<String> {
        self.sent_replies.lock().unwrap().push(reply.clone());
        Ok(format!("sent-{}", self.sent_replies.lock().unwrap().len()))
    }

    async fn add_label(&self, message_id: &str, label_name: &str) -> anyhow::Result<()> {
        self.labels
            .lock()
            .unwrap()
            .get_mut(message_id)
            .ok_or_else(|| anyhow!("no such message {}", message_id))?
            .insert(label_name.to_string());
        Ok(())
    }

    async fn mark_as_read(&self, message_id: &str) -> anyhow::Result<()> {
        self.labels
            .lock()
            .unwrap()
            .get_mut(message_id)
            .ok_or_else(|| anyhow!("no such message {}", message_id))?
            .remove("UNREAD");
        Ok(())
    }

    async fn archive(&self, message_id: &str) -> anyhow::Result<()> {
        self.labels
            .lock()
            .unwrap()
            .get_mut(message_id)
            .ok_or_else(|| anyhow!("no such message {}", message_id))?
            .remove("INBOX");
        Ok(())
    }
}

pub struct FakeConnector {
    pub mailbox: Arc<FakeMailbox>,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl MailboxConnector for FakeConnector {
    fn connect(&self, access_token: String) -> Arc<dyn Mailbox> {
        self.tokens_seen.lock().unwrap().push(access_token);
        self.mailbox.clone()
    }
}

/// Classifier returning canned results, recording what it was shown.
pub struct ScriptedClassifier {
    pub default: Classification,
    pub overrides: Mutex<HashMap<String, Classification>>,
    pub failing: Mutex<HashSet<String>>,
    pub seen_campaigns: Mutex<HashMap<String, Option<CampaignLink>>>,
    pub seen_contexts: Mutex<HashMap<String, ContextSnapshot>>,
}

impl ScriptedClassifier {
    pub fn new(default: Classification) -> Arc<Self> {
        Arc::new(ScriptedClassifier {
            default,
            overrides: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            seen_campaigns: Mutex::new(HashMap::new()),
            seen_contexts: Mutex::new(HashMap::new()),
        })
    }

    pub fn fail_on(&self, message_id: &str) {
        self.failing.lock().unwrap().insert(message_id.to_string());
    }

    pub fn override_for(&self, message_id: &str, classification: Classification) {
        self.overrides
            .lock()
            .unwrap()
            .insert(message_id.to_string(), classification);
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, request: ClassifyRequest<'_>) -> anyhow::Result<Classification> {
        let id = request.message.id.clone();
        self.seen_campaigns
            .lock()
            .unwrap()
            .insert(id.clone(), request.campaign.cloned());
        self.seen_contexts
            .lock()
            .unwrap()
            .insert(id.clone(), request.context);

        if self.failing.lock().unwrap().contains(&id) {
            return Err(anyhow!("simulated classifier outage"));
        }
        Ok(self
            .overrides
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Token exchange with a fixed outcome. `None` behaves like a revoked
/// refresh token.
pub struct StaticExchange {
    pub response: Mutex<Option<RefreshTokenResponse>>,
}

impl StaticExchange {
    pub fn new(response: Option<RefreshTokenResponse>) -> Arc<Self> {
        Arc::new(StaticExchange {
            response: Mutex::new(response),
        })
    }
}

#[async_trait]
impl RefreshTokenExchange for StaticExchange {
    async fn exchange(&self, _refresh_token: &str) -> OauthResult<RefreshTokenResponse> {
        match self.response.lock().unwrap().clone() {
            Some(resp) => Ok(resp),
            None => Err(OauthError::ExpiredOrRevoked),
        }
    }
}

/// Notifier counting escalation callbacks.
#[derive(Default)]
pub struct CountingNotifier {
    pub escalations: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSender for CountingNotifier {
    async fn escalation_received(
        &self,
        _mailbox_id: &str,
        message: &InboundMessage,
    ) -> anyhow::Result<()> {
        self.escalations.lock().unwrap().push(message.id.clone());
        Ok(())
    }
}

pub fn inbound(
    id: &str,
    thread_id: &str,
    from: &str,
    received_at: DateTime<Utc>,
) -> InboundMessage {
    InboundMessage {
        id: id.to_string(),
        thread_id: thread_id.to_string(),
        from: EmailAddress {
            email: from.to_string(),
            name: None,
        },
        to: vec!["desk@ourfirm.com".to_string()],
        cc: vec![],
        bcc: vec![],
        reply_to: None,
        subject: format!("subject {id}"),
        body_text: Some(format!("body {id}")),
        body_html: None,
        snippet: format!("snippet {id}"),
        labels: vec!["INBOX".to_string(), "UNREAD".to_string()],
        attachments: vec![],
        received_at,
    }
}

pub fn classification(category: Category, confidence: f32) -> Classification {
    Classification {
        category,
        confidence,
        intent: "scripted".to_string(),
        entities: vec![],
        reasoning: String::new(),
        should_escalate: false,
    }
}

pub fn executed_send(
    thread_id: &str,
    job_id: Option<&str>,
    executed_at: DateTime<Utc>,
    subject: &str,
) -> ActionCard {
    ActionCard {
        id: Uuid::new_v4(),
        mailbox_id: MAILBOX_ID.to_string(),
        card_type: CardType::SendEmail,
        state: CardState::Done,
        auto_execute: true,
        source_message_id: "outbound".to_string(),
        thread_id: thread_id.to_string(),
        category: None,
        title: subject.to_string(),
        job_id: job_id.map(str::to_string),
        task_id: Some(11),
        action_payload: serde_json::json!({
            "messageId": "prov-outbound",
            "subject": subject,
            "body": format!("body of {subject}"),
        }),
        executed_at: Some(executed_at),
        created_at: Utc::now(),
    }
}

/// A fully wired pipeline over in-memory stores and fakes, with a connected,
/// enabled, auto-processing mailbox.
pub struct Harness {
    pub credentials: Arc<MemoryCredentialStore>,
    pub sync_states: Arc<MemorySyncStateStore>,
    pub messages: Arc<MemoryMessageStore>,
    pub cards: Arc<MemoryCardStore>,
    pub contacts: Arc<MemoryContactDirectory>,
    pub jobs: Arc<MemoryJobStore>,
    pub mailbox: Arc<FakeMailbox>,
    pub connector: Arc<FakeConnector>,
    pub classifier: Arc<ScriptedClassifier>,
    pub exchange: Arc<StaticExchange>,
    pub notifier: Arc<CountingNotifier>,
    pub pipeline: MailboxPipeline,
}

impl Harness {
    pub async fn new() -> Harness {
        Self::with_default_classification(classification(Category::Updates, 0.99)).await
    }

    pub async fn with_default_classification(default: Classification) -> Harness {
        let credentials = MemoryCredentialStore::new();
        let sync_states = MemorySyncStateStore::new();
        let messages = MemoryMessageStore::new();
        let cards = MemoryCardStore::new();
        let contacts = MemoryContactDirectory::new();
        let jobs = MemoryJobStore::new();
        let mailbox = FakeMailbox::new();
        let connector = Arc::new(FakeConnector {
            mailbox: mailbox.clone(),
            tokens_seen: Mutex::new(Vec::new()),
        });
        let classifier = ScriptedClassifier::new(default);
        let exchange = StaticExchange::new(None);
        let notifier = Arc::new(CountingNotifier::default());

        credentials
            .put(MailboxConnection {
                mailbox_id: MAILBOX_ID.to_string(),
                provider: "google".to_string(),
                access_token: "valid-token".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Utc::now() + Duration::hours(1),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await;
        sync_states.put(SyncState::new(MAILBOX_ID)).await;

        let token_manager = Arc::new(TokenManager::new(credentials.clone(), exchange.clone()));
        let pipeline = MailboxPipeline::new(
            token_manager,
            connector.clone(),
            sync_states.clone(),
            messages.clone(),
            cards.clone(),
            ContextBuilder::new(contacts.clone()),
            CampaignCorrelator::new(cards.clone(), jobs.clone()),
            InboxCurator::new(notifier.clone()),
            classifier.clone(),
            Arc::new(DefaultCardFactory),
        );

        Harness {
            credentials,
            sync_states,
            messages,
            cards,
            contacts,
            jobs,
            mailbox,
            connector,
            classifier,
            exchange,
            notifier,
            pipeline,
        }
    }

    pub async fn sync_state(&self) -> SyncState {
        use crate::store::SyncStateStore;
        self.sync_states.get(MAILBOX_ID).await.unwrap().unwrap()
    }
}
