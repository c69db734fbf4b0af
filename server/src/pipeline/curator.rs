use std::sync::Arc;

use crate::{
    email::{message::InboundMessage, Mailbox},
    model::{
        card::ActionCard,
        labels::{Category, UtilityLabels},
        message_record::Classification,
    },
};

use super::collaborators::NotificationSender;

/// Applies the post-classification mailbox side effects. Everything here is
/// cosmetic relative to the system of record: the card already exists, so
/// failures are logged and swallowed and the mailbox may lag until the next
/// cycle touches it.
pub struct InboxCurator {
    notifier: Arc<dyn NotificationSender>,
}

impl InboxCurator {
    pub fn new(notifier: Arc<dyn NotificationSender>) -> Self {
        InboxCurator { notifier }
    }

    pub async fn curate(
        &self,
        mailbox: &Arc<dyn Mailbox>,
        mailbox_id: &str,
        message: &InboundMessage,
        classification: &Classification,
        card: &ActionCard,
    ) {
        let category_label = classification.category.mail_label();
        if let Err(e) = mailbox.add_label(&message.id, &category_label).await {
            tracing::warn!(
                "Failed to label message {} with {}: {:?}",
                message.id,
                category_label,
                e
            );
        }

        if card.auto_execute {
            // Handled without a human; get it out of the inbox.
            if let Err(e) = mailbox.mark_as_read(&message.id).await {
                tracing::warn!("Failed to mark message {} as read: {:?}", message.id, e);
            }
            if let Err(e) = mailbox
                .add_label(&message.id, &UtilityLabels::AutoResponded.mail_label())
                .await
            {
                tracing::warn!(
                    "Failed to apply auto-responded label to {}: {:?}",
                    message.id,
                    e
                );
            }
            if let Err(e) = mailbox.archive(&message.id).await {
                tracing::warn!("Failed to archive message {}: {:?}", message.id, e);
            }
        }

        if classification.should_escalate || classification.category == Category::Escalate {
            if let Err(e) = self.notifier.escalation_received(mailbox_id, message).await {
                tracing::warn!(
                    "Escalation notifier failed for message {}: {:?}",
                    message.id,
                    e
                );
            }
        }
    }
}
