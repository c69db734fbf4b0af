pub mod client;
pub mod message;
pub mod outbound;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use self::{client::GmailClient, message::InboundMessage, outbound::OutboundReply};
use crate::HttpClient;

/// Provider operations the pipeline needs from a connected mailbox.
/// `GmailClient` is the production implementation; tests run against an
/// in-memory fake.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Ids of primary-inbox messages received after `since`, capped per
    /// cycle. Bulk/social categories are excluded at the query level.
    async fn list_new_message_ids(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<String>>;

    /// Full message fetch and parse. `Ok(None)` means the provider returned
    /// something unparsable; callers treat that as a per-message error.
    async fn fetch_message(&self, message_id: &str) -> anyhow::Result<Option<InboundMessage>>;

    /// Send a reply on an existing thread. Returns the provider message id.
    async fn send_reply(&self, reply: &OutboundReply) -> anyhow::Result<String>;

    /// Apply a label by name, creating it first if it does not exist.
    async fn add_label(&self, message_id: &str, label_name: &str) -> anyhow::Result<()>;

    async fn mark_as_read(&self, message_id: &str) -> anyhow::Result<()>;

    /// Remove the message from the inbox without deleting it.
    async fn archive(&self, message_id: &str) -> anyhow::Result<()>;
}

/// Builds a mailbox client from the access token the token manager produced
/// for this cycle.
pub trait MailboxConnector: Send + Sync {
    fn connect(&self, access_token: String) -> Arc<dyn Mailbox>;
}

pub struct GmailConnector {
    http_client: HttpClient,
}

impl GmailConnector {
    pub fn new(http_client: HttpClient) -> Self {
        GmailConnector { http_client }
    }
}

impl MailboxConnector for GmailConnector {
    fn connect(&self, access_token: String) -> Arc<dyn Mailbox> {
        Arc::new(GmailClient::new(self.http_client.clone(), access_token))
    }
}
