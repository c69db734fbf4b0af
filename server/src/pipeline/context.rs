use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    email::message::InboundMessage,
    model::message_record::ContextSnapshot,
    store::ContactDirectory,
};

/// Resolves sender context for a whole batch: one directory lookup per
/// unique sender address, however many messages they sent.
pub struct ContextBuilder {
    contacts: Arc<dyn ContactDirectory>,
}

impl ContextBuilder {
    pub fn new(contacts: Arc<dyn ContactDirectory>) -> Self {
        ContextBuilder { contacts }
    }

    /// Map of lowercased sender address to context flags. A failed or empty
    /// lookup degrades to all-false flags; it never fails the batch.
    pub async fn build(
        &self,
        messages: &[InboundMessage],
    ) -> HashMap<String, ContextSnapshot> {
        let mut map: HashMap<String, ContextSnapshot> = HashMap::new();

        for message in messages {
            let sender = message.from.email.to_ascii_lowercase();
            if map.contains_key(&sender) {
                continue;
            }

            let snapshot = match self.contacts.lookup(&sender).await {
                Ok(Some(profile)) => ContextSnapshot {
                    is_existing_client: profile.client_id.is_some(),
                    has_active_orders: profile.has_active_orders,
                },
                Ok(None) => ContextSnapshot::default(),
                Err(e) => {
                    tracing::warn!(
                        "Contact lookup failed for {}, defaulting context: {:?}",
                        sender,
                        e
                    );
                    ContextSnapshot::default()
                }
            };

            map.insert(sender, snapshot);
        }

        map
    }
}
