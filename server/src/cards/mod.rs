//! Default card policy wired behind the `CardFactory` seam. Maps a
//! classification to a card type, an initial lifecycle state, and the
//! auto-execute flag. Deployments with their own triage rules replace this
//! with a different `CardFactory` implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    email::message::InboundMessage,
    model::{
        card::{ActionCard, CardState, CardType},
        labels::Category,
        message_record::{CampaignLink, Classification},
    },
    pipeline::collaborators::CardFactory,
    server_config::cfg,
};

pub struct DefaultCardFactory;

/// Triage outcome for one classification.
fn triage(classification: &Classification) -> (CardType, CardState, bool) {
    let confident = classification.confidence >= cfg.classifier.auto_execute_confidence;

    // Escalations and low-confidence calls always land on a human.
    if classification.should_escalate
        || classification.category == Category::Escalate
        || !confident
    {
        return (CardType::CreateTask, CardState::NeedsReview, false);
    }

    match classification.category {
        Category::Scheduling => (CardType::ScheduleCall, CardState::Approved, true),
        Category::Opportunity => (CardType::CreateDeal, CardState::NeedsReview, false),
        Category::Status | Category::Remove | Category::Notifications => {
            (CardType::SendEmail, CardState::Approved, true)
        }
        Category::Updates => (CardType::FollowUp, CardState::NeedsReview, false),
        Category::AmcOrder | Category::Case | Category::Ap | Category::Ar => {
            (CardType::CreateTask, CardState::NeedsReview, false)
        }
        Category::Information => (CardType::Research, CardState::Pending, false),
        Category::Escalate => (CardType::CreateTask, CardState::NeedsReview, false),
    }
}

#[async_trait]
impl CardFactory for DefaultCardFactory {
    async fn create_card(
        &self,
        mailbox_id: &str,
        message: &InboundMessage,
        classification: &Classification,
        campaign: Option<&CampaignLink>,
    ) -> anyhow::Result<ActionCard> {
        let (card_type, state, auto_execute) = triage(classification);

        let title = if message.subject.is_empty() {
            format!("Email from {}", message.from.email)
        } else {
            message.subject.clone()
        };

        Ok(ActionCard {
            id: Uuid::new_v4(),
            mailbox_id: mailbox_id.to_string(),
            card_type,
            state,
            auto_execute,
            source_message_id: message.id.clone(),
            thread_id: message.thread_id.clone(),
            category: Some(classification.category),
            title,
            job_id: campaign.and_then(|c| c.job_id.clone()),
            task_id: campaign.and_then(|c| c.task_id),
            action_payload: json!({
                "messageId": message.id,
                "subject": message.subject,
                "from": message.from.email,
                "intent": classification.intent,
            }),
            executed_at: None,
            created_at: Utc::now(),
        })
    }
}
