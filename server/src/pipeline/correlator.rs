use std::sync::Arc;

use serde::Deserialize;

use crate::{
    email::message::InboundMessage,
    model::message_record::{CampaignLink, JobContext},
    store::{CardStore, JobStore},
};

/// Payload stored on an executed outbound send card. Fields are optional
/// because older cards carry partial payloads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SendPayload {
    message_id: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    body_text: Option<String>,
}

/// Links an inbound reply to the outbound campaign send that started its
/// thread, and loads the job context the classifier needs.
pub struct CampaignCorrelator {
    cards: Arc<dyn CardStore>,
    jobs: Arc<dyn JobStore>,
}

impl CampaignCorrelator {
    pub fn new(cards: Arc<dyn CardStore>, jobs: Arc<dyn JobStore>) -> Self {
        CampaignCorrelator { cards, jobs }
    }

    /// `None` means "not a campaign reply": no executed send on the thread,
    /// or the send was manual (no job), or the job is gone. When a thread has
    /// several prior sends, the most recently executed one wins so replies
    /// correlate to the latest follow-up.
    pub async fn correlate(
        &self,
        message: &InboundMessage,
    ) -> anyhow::Result<Option<CampaignLink>> {
        let Some(card) = self
            .cards
            .find_latest_executed_send(&message.thread_id)
            .await?
        else {
            return Ok(None);
        };

        let Some(job_id) = card.job_id.clone() else {
            // A manual send has no campaign context.
            return Ok(None);
        };

        let Some(job) = self.jobs.get(&job_id).await? else {
            tracing::warn!(
                "Send card {} references missing job {}",
                card.id,
                job_id
            );
            return Ok(None);
        };

        let payload: SendPayload =
            serde_json::from_value(card.action_payload.clone()).unwrap_or_default();

        Ok(Some(CampaignLink {
            is_campaign_reply: true,
            job_id: Some(job_id),
            task_id: card.task_id,
            original_message_id: payload.message_id,
            job_context: Some(JobContext {
                job_name: job.name,
                job_description: job.description,
                original_email_subject: payload.subject.unwrap_or_default(),
                original_email_body: payload.body.or(payload.body_text).unwrap_or_default(),
            }),
        }))
    }
}
