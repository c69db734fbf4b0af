extern crate google_gmail1 as gmail1;

use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use gmail1::api::{Label, ListLabelsResponse, ListMessagesResponse, Message};
use leaky_bucket::RateLimiter;
use lib_email_clients::gmail::api_quota::GMAIL_API_QUOTA;
use serde_json::json;

use async_trait::async_trait;

use crate::{
    rate_limiters::gmail_quota_limiter,
    server_config::cfg,
    HttpClient,
};

use super::{message::InboundMessage, outbound::OutboundReply, Mailbox};

macro_rules! gmail_url {
    ($($params:expr),*) => {
        {
            const GMAIL_ENDPOINT: &str = "https://www.googleapis.com/gmail/v1/users/me";
            let list_params = vec![$($params),*];
            let path = list_params.join("/");
            format!("{}/{}", GMAIL_ENDPOINT, path)
        }
    };
}

/// Gmail wire client for one mailbox. Constructed per poll cycle from the
/// access token the token manager produced; never cached process-wide.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http_client: HttpClient,
    access_token: String,
    rate_limiter: Arc<RateLimiter>,
}

impl GmailClient {
    pub fn new(http_client: HttpClient, access_token: String) -> GmailClient {
        GmailClient {
            http_client,
            access_token,
            rate_limiter: gmail_quota_limiter(),
        }
    }

    async fn get_labels(&self) -> anyhow::Result<Vec<Label>> {
        self.rate_limiter.acquire(GMAIL_API_QUOTA.labels_list).await;
        let resp = self
            .http_client
            .get(gmail_url!("labels"))
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;
        let data = resp.json::<ListLabelsResponse>().await?;

        Ok(data.labels.unwrap_or_default())
    }

    async fn find_label_id(&self, name: &str) -> anyhow::Result<Option<String>> {
        let labels = self.get_labels().await?;
        Ok(labels
            .into_iter()
            .find(|l| l.name.as_deref() == Some(name))
            .and_then(|l| l.id))
    }

    async fn create_label(&self, name: &str) -> anyhow::Result<Option<String>> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.labels_create)
            .await;

        let label = Label {
            id: None,
            type_: Some("user".to_string()),
            color: None,
            name: Some(name.to_string()),
            messages_total: None,
            messages_unread: None,
            threads_total: None,
            threads_unread: None,
            message_list_visibility: Some("show".to_string()),
            label_list_visibility: Some("labelShow".to_string()),
        };

        let resp = self
            .http_client
            .post(gmail_url!("labels"))
            .bearer_auth(&self.access_token)
            .json(&label)
            .send()
            .await?;
        let data = resp.json::<serde_json::Value>().await?;
        if let Some(error) = data.get("error") {
            if error.get("code").is_some_and(|x| x.as_i64() == Some(409)) {
                // Label already exists; caller re-resolves by name.
                return Ok(None);
            }
            return Err(anyhow!("Error creating label {:?}: {:?}", name, data));
        }

        let label: Label = serde_json::from_value(data)?;
        Ok(label.id)
    }

    /// Label id for `name`, creating the label when it does not exist yet.
    async fn resolve_label_id(&self, name: &str) -> anyhow::Result<String> {
        if let Some(id) = self.find_label_id(name).await? {
            return Ok(id);
        }

        match self.create_label(name).await? {
            Some(id) => Ok(id),
            // Lost a create race; the label exists now.
            None => self
                .find_label_id(name)
                .await?
                .context(format!("Label {} missing after create conflict", name)),
        }
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        add_label_ids: Vec<String>,
        remove_label_ids: Vec<String>,
    ) -> anyhow::Result<()> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_modify)
            .await;
        let resp = self
            .http_client
            .post(gmail_url!("messages", message_id, "modify"))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "addLabelIds": add_label_ids,
                "removeLabelIds": remove_label_ids
            }))
            .send()
            .await?;

        resp.error_for_status()
            .context(format!("Error modifying labels on message {}", message_id))?;

        Ok(())
    }
}

/// Search query for new primary-inbox mail, bounded below by the cursor.
fn build_search_query(since: DateTime<Utc>) -> String {
    format!(
        "in:inbox -category:promotions -category:social after:{}",
        since.timestamp()
    )
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_new_message_ids(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<String>> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_list)
            .await;

        let query = vec![
            ("q".to_string(), build_search_query(since)),
            ("maxResults".to_string(), cfg.sync.batch_cap.to_string()),
        ];

        let resp = self
            .http_client
            .get(gmail_url!("messages"))
            .query(&query)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;

        let data = resp.json::<ListMessagesResponse>().await?;

        Ok(data
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg| msg.id)
            .collect())
    }

    async fn fetch_message(&self, message_id: &str) -> anyhow::Result<Option<InboundMessage>> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_get)
            .await;
        let resp = self
            .http_client
            .get(gmail_url!("messages", message_id))
            .bearer_auth(&self.access_token)
            .query(&[("format", "FULL")])
            .send()
            .await?
            .error_for_status()
            .context(format!("Error getting message {}", message_id))?;

        let message = resp
            .json::<Message>()
            .await
            .context("Error decoding message")?;

        Ok(InboundMessage::from_gmail_message(&message))
    }

    async fn send_reply(&self, reply: &OutboundReply) -> anyhow::Result<String> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_send)
            .await;

        let raw = super::outbound::build_reply_raw(reply)?;
        let body = json!({
            "raw": raw,
            "threadId": reply.thread_id,
        });

        let resp = self
            .http_client
            .post(gmail_url!("messages", "send"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let data = resp.json::<serde_json::Value>().await?;
        if let Some(error) = data.get("error") {
            return Err(anyhow!("Error sending reply: {:?}", error));
        }

        let message: Message =
            serde_json::from_value(data).context("Failed to parse send response")?;
        message.id.context("Send response missing message id")
    }

    async fn add_label(&self, message_id: &str, label_name: &str) -> anyhow::Result<()> {
        let label_id = self.resolve_label_id(label_name).await?;
        self.modify_labels(message_id, vec![label_id], vec![]).await
    }

    async fn mark_as_read(&self, message_id: &str) -> anyhow::Result<()> {
        self.modify_labels(message_id, vec![], vec!["UNREAD".to_string()])
            .await
    }

    async fn archive(&self, message_id: &str) -> anyhow::Result<()> {
        self.modify_labels(message_id, vec![], vec!["INBOX".to_string()])
            .await
    }
}
