//! HTTP client for the external classifier service. The pipeline only
//! depends on the `Classifier` trait; this is the production wiring.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tokio::time::Duration;

use crate::{
    model::message_record::Classification,
    pipeline::collaborators::{Classifier, ClassifyRequest},
    server_config::cfg,
    HttpClient,
};

pub struct HttpClassifier {
    http_client: HttpClient,
}

impl HttpClassifier {
    pub fn new(http_client: HttpClient) -> Self {
        HttpClassifier { http_client }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, request: ClassifyRequest<'_>) -> anyhow::Result<Classification> {
        let message = request.message;
        let payload = json!({
            "message": {
                "id": message.id,
                "threadId": message.thread_id,
                "from": message.from.email,
                "subject": message.subject,
                "body": message.classification_text(),
                "snippet": message.snippet,
                "hasAttachments": !message.attachments.is_empty(),
            },
            "sender": {
                "isExistingClient": request.context.is_existing_client,
                "hasActiveOrders": request.context.has_active_orders,
            },
            "campaign": request.campaign,
        });

        let resp = self
            .http_client
            .post(&cfg.classifier.endpoint)
            .timeout(Duration::from_secs(cfg.classifier.timeout_secs))
            .json(&payload)
            .send()
            .await
            .context("Classifier request failed")?
            .error_for_status()
            .context("Classifier returned an error status")?;

        resp.json::<Classification>()
            .await
            .context("Classifier returned a malformed response")
    }
}
