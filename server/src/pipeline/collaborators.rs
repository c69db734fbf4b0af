//! Seams for the external collaborators the pipeline drives but does not
//! implement: the AI classifier, the card policy, and the escalation
//! notifier.

use async_trait::async_trait;

use crate::{
    email::message::InboundMessage,
    model::{
        card::ActionCard,
        message_record::{CampaignLink, Classification, ContextSnapshot},
    },
};

/// Everything the classifier gets to look at for one message.
pub struct ClassifyRequest<'a> {
    pub message: &'a InboundMessage,
    pub context: ContextSnapshot,
    pub campaign: Option<&'a CampaignLink>,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: ClassifyRequest<'_>) -> anyhow::Result<Classification>;
}

/// Turns a classification into an action card value. The pipeline persists
/// the card and drives curation off `auto_execute`; the policy inside is
/// replaceable.
#[async_trait]
pub trait CardFactory: Send + Sync {
    async fn create_card(
        &self,
        mailbox_id: &str,
        message: &InboundMessage,
        classification: &Classification,
        campaign: Option<&CampaignLink>,
    ) -> anyhow::Result<ActionCard>;
}

/// Extension point invoked when a message escalates. Delivery of a holding
/// reply is an external capability; the default implementation only records
/// that the hook fired.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn escalation_received(
        &self,
        mailbox_id: &str,
        message: &InboundMessage,
    ) -> anyhow::Result<()>;
}

pub struct LogOnlyNotifier;

#[async_trait]
impl NotificationSender for LogOnlyNotifier {
    async fn escalation_received(
        &self,
        mailbox_id: &str,
        message: &InboundMessage,
    ) -> anyhow::Result<()> {
        tracing::info!(
            "Escalation on mailbox {} message {}; holding reply left to the notification service",
            mailbox_id,
            message.id
        );
        Ok(())
    }
}
