use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::{
    auth::token_manager::TokenManager,
    email::{message::InboundMessage, Mailbox, MailboxConnector},
    model::{
        mailbox::CursorAdvance,
        message_record::ContextSnapshot,
    },
    rate_limiters::bounded_batch,
    server_config::cfg,
    store::{CardStore, MessageStore, SyncStateStore},
};

use super::{
    collaborators::{CardFactory, Classifier, ClassifyRequest},
    context::ContextBuilder,
    correlator::CampaignCorrelator,
    curator::InboxCurator,
    types::{PollError, PollResult, PollStage},
};

/// Runs one poll cycle per invocation. There is no in-process scheduler and
/// no retry loop: the external trigger re-invokes, and the idempotency key
/// on stored messages makes blind re-invocation safe.
pub struct MailboxPipeline {
    token_manager: Arc<TokenManager>,
    connector: Arc<dyn MailboxConnector>,
    sync_states: Arc<dyn SyncStateStore>,
    messages: Arc<dyn MessageStore>,
    cards: Arc<dyn CardStore>,
    context_builder: ContextBuilder,
    correlator: CampaignCorrelator,
    curator: InboxCurator,
    classifier: Arc<dyn Classifier>,
    card_factory: Arc<dyn CardFactory>,
}

impl MailboxPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token_manager: Arc<TokenManager>,
        connector: Arc<dyn MailboxConnector>,
        sync_states: Arc<dyn SyncStateStore>,
        messages: Arc<dyn MessageStore>,
        cards: Arc<dyn CardStore>,
        context_builder: ContextBuilder,
        correlator: CampaignCorrelator,
        curator: InboxCurator,
        classifier: Arc<dyn Classifier>,
        card_factory: Arc<dyn CardFactory>,
    ) -> Self {
        MailboxPipeline {
            token_manager,
            connector,
            sync_states,
            messages,
            cards,
            context_builder,
            correlator,
            curator,
            classifier,
            card_factory,
        }
    }

    /// One scheduled poll cycle for a mailbox.
    pub async fn poll_mailbox(&self, mailbox_id: &str) -> PollResult {
        tracing::info!("Starting poll cycle for mailbox {}", mailbox_id);
        let result = self.run_cycle(mailbox_id).await;
        tracing::info!(
            "Poll cycle for mailbox {} done: success={} processed={} cards={} auto={} errors={}",
            mailbox_id,
            result.success,
            result.messages_processed,
            result.cards_created,
            result.auto_executed_cards,
            result.errors.len()
        );
        result
    }

    /// Operator-triggered sync. Identical behavior, different trigger source.
    pub async fn manual_sync(&self, mailbox_id: &str) -> PollResult {
        tracing::info!("Manual sync requested for mailbox {}", mailbox_id);
        self.run_cycle(mailbox_id).await
    }

    async fn run_cycle(&self, mailbox_id: &str) -> PollResult {
        let mut result = PollResult::default();
        let deadline = Instant::now() + Duration::from_secs(cfg.sync.cycle_budget_secs);

        let sync_state = match self.sync_states.get(mailbox_id).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                result.errors.push(PollError::mailbox(
                    PollStage::Connect,
                    format!("no sync state for mailbox {}", mailbox_id),
                ));
                return result;
            }
            Err(e) => {
                result.errors.push(PollError::mailbox(
                    PollStage::Connect,
                    format!("failed to load sync state: {e:?}"),
                ));
                return result;
            }
        };

        if !sync_state.enabled {
            // Disabled is policy, not an error.
            tracing::debug!("Mailbox {} is disabled, skipping cycle", mailbox_id);
            return PollResult::empty_success();
        }

        // One token per cycle, reused across the whole batch.
        let token = match self.token_manager.valid_access_token(mailbox_id).await {
            Ok(token) => token,
            Err(e) => {
                result
                    .errors
                    .push(PollError::mailbox(PollStage::Connect, e.to_string()));
                return result;
            }
        };

        let mailbox = self.connector.connect(token.token);

        let since = sync_state.last_sync_at.unwrap_or_else(|| {
            Utc::now() - chrono::Duration::hours(cfg.sync.first_sync_lookback_hours)
        });

        let ids = match mailbox.list_new_message_ids(since).await {
            Ok(ids) => ids,
            Err(e) => {
                result.errors.push(PollError::mailbox(
                    PollStage::List,
                    format!("message listing failed: {e:?}"),
                ));
                return result;
            }
        };

        if ids.is_empty() {
            result.success = true;
            self.advance_cursor(mailbox_id, None, 0).await;
            return result;
        }

        tracing::debug!("Mailbox {}: fetching {} message ids", mailbox_id, ids.len());

        // Fetch is the only concurrent stage, bounded to stay inside the
        // provider quota.
        let outcome = bounded_batch(ids, cfg.sync.fetch_concurrency, |id| {
            let mailbox = mailbox.clone();
            async move {
                let parsed = mailbox.fetch_message(&id).await?;
                Ok((id, parsed))
            }
        })
        .await;

        for failed in outcome.errors {
            result.errors.push(PollError::message(
                PollStage::Fetch,
                failed.item,
                format!("{:?}", failed.error),
            ));
        }

        let mut messages: Vec<InboundMessage> = Vec::with_capacity(outcome.results.len());
        for (id, parsed) in outcome.results {
            match parsed {
                Some(message) => messages.push(message),
                None => result.errors.push(PollError::message(
                    PollStage::Parse,
                    id,
                    "message could not be parsed",
                )),
            }
        }

        // Oldest first, so cursor advancement and correlation are
        // deterministic regardless of fetch completion order.
        messages.sort_by_key(|m| m.received_at);

        let context_map = self.context_builder.build(&messages).await;

        let mut last_received_at: Option<DateTime<Utc>> = None;
        for (idx, message) in messages.iter().enumerate() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Cycle budget exceeded for mailbox {}, leaving {} messages for the next cycle",
                    mailbox_id,
                    messages.len() - idx
                );
                break;
            }

            self.process_message(
                mailbox_id,
                &mailbox,
                message,
                &context_map,
                sync_state.auto_process,
                &mut result,
            )
            .await;

            last_received_at = Some(
                last_received_at
                    .map_or(message.received_at, |t| t.max(message.received_at)),
            );
        }

        result.success = true;
        self.advance_cursor(
            mailbox_id,
            last_received_at,
            result.messages_processed as u64,
        )
        .await;

        result
    }

    /// Drive one message through dedupe, persistence, classification, card
    /// creation, and curation. Any failure is isolated to this message.
    async fn process_message(
        &self,
        mailbox_id: &str,
        mailbox: &Arc<dyn Mailbox>,
        message: &InboundMessage,
        context_map: &HashMap<String, ContextSnapshot>,
        auto_process: bool,
        result: &mut PollResult,
    ) {
        match self.messages.find(mailbox_id, &message.id).await {
            Ok(Some(_)) => {
                tracing::debug!("Message {} already ingested, skipping", message.id);
                return;
            }
            Ok(None) => {}
            Err(e) => {
                result.errors.push(PollError::message(
                    PollStage::Persist,
                    message.id.clone(),
                    format!("dedupe lookup failed: {e:?}"),
                ));
                return;
            }
        }

        // Persist the raw message before classification. A record without a
        // classification is a valid resumable state, not corruption.
        let record = message.to_record(mailbox_id, Utc::now());
        if let Err(e) = self.messages.insert(&record).await {
            result.errors.push(PollError::message(
                PollStage::Persist,
                message.id.clone(),
                format!("insert failed: {e:?}"),
            ));
            return;
        }

        if !auto_process {
            tracing::debug!(
                "Auto-process disabled for mailbox {}; message {} stored without a card",
                mailbox_id,
                message.id
            );
            result.messages_processed += 1;
            return;
        }

        let context = context_map
            .get(&message.from.email.to_ascii_lowercase())
            .copied()
            .unwrap_or_default();

        let campaign = match self.correlator.correlate(message).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(
                    "Correlation failed for message {}, continuing without campaign context: {:?}",
                    message.id,
                    e
                );
                None
            }
        };

        let classification = match self
            .classifier
            .classify(ClassifyRequest {
                message,
                context,
                campaign: campaign.as_ref(),
            })
            .await
        {
            Ok(classification) => classification,
            Err(e) => {
                // The record stays persisted-but-unclassified; a later cycle
                // or a backfill can pick it up.
                result.errors.push(PollError::message(
                    PollStage::Classify,
                    message.id.clone(),
                    format!("classification failed: {e:?}"),
                ));
                return;
            }
        };

        if let Err(e) = self
            .messages
            .record_classification(
                mailbox_id,
                &message.id,
                &classification,
                campaign.as_ref(),
                Utc::now(),
            )
            .await
        {
            result.errors.push(PollError::message(
                PollStage::Persist,
                message.id.clone(),
                format!("classification update failed: {e:?}"),
            ));
            return;
        }

        let card = match self
            .card_factory
            .create_card(mailbox_id, message, &classification, campaign.as_ref())
            .await
        {
            Ok(card) => card,
            Err(e) => {
                result.errors.push(PollError::message(
                    PollStage::Card,
                    message.id.clone(),
                    format!("card creation failed: {e:?}"),
                ));
                return;
            }
        };

        if let Err(e) = self.cards.insert(&card).await {
            result.errors.push(PollError::message(
                PollStage::Card,
                message.id.clone(),
                format!("card insert failed: {e:?}"),
            ));
            return;
        }

        result.cards_created += 1;
        if card.auto_execute {
            result.auto_executed_cards += 1;
        }

        // Curation failures are cosmetic; the card is already durable.
        self.curator
            .curate(mailbox, mailbox_id, message, &classification, &card)
            .await;

        result.messages_processed += 1;
    }

    /// The cursor moves exactly once per completed cycle, even when
    /// individual messages failed. `last_sync_at` is stamped with "now";
    /// the receive watermark takes the max observed `received_at`.
    async fn advance_cursor(
        &self,
        mailbox_id: &str,
        last_received_at: Option<DateTime<Utc>>,
        newly_synced: u64,
    ) {
        let update = CursorAdvance {
            last_sync_at: Utc::now(),
            last_message_received_at: last_received_at,
            newly_synced,
        };
        if let Err(e) = self.sync_states.advance(mailbox_id, update).await {
            tracing::error!(
                "Failed to advance sync cursor for mailbox {}: {:?}",
                mailbox_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use crate::auth::oauth::RefreshTokenResponse;
    use crate::model::labels::Category;
    use crate::model::mailbox::{MailboxConnection, SyncState};
    use crate::store::JobSummary;
    use crate::testing::common::*;

    use super::*;

    #[tokio::test]
    async fn test_first_cycle_with_no_messages() {
        let h = Harness::new().await;

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.messages_processed, 0);
        assert_eq!(result.cards_created, 0);
        assert_eq!(result.auto_executed_cards, 0);
        assert!(result.errors.is_empty());

        // Empty cycle still completes: the sync stamp moves, the receive
        // watermark does not.
        let state = h.sync_state().await;
        assert!(state.last_sync_at.is_some());
        assert!(state.last_message_received_at.is_none());

        // First-ever sync polls a bounded lookback window, not all of time.
        let since = h.mailbox.listed_since.lock().unwrap()[0];
        let expected = Utc::now() - ChronoDuration::hours(24);
        assert!((since - expected).num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn test_three_messages_reviewed_not_auto_executed() {
        let h = Harness::new().await;
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let t2 = t1 + ChronoDuration::minutes(10);
        let t3 = t1 + ChronoDuration::minutes(20);
        // Seeded out of order on purpose.
        h.mailbox.seed(inbound("m2", "t2", "a@example.com", t2));
        h.mailbox.seed(inbound("m1", "t1", "a@example.com", t1));
        h.mailbox.seed(inbound("m3", "t3", "b@example.com", t3));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.messages_processed, 3);
        assert_eq!(result.cards_created, 3);
        assert_eq!(result.auto_executed_cards, 0);
        assert!(result.errors.is_empty());

        // Nothing auto-executed, so everything stays in the inbox.
        for id in ["m1", "m2", "m3"] {
            let labels = h.mailbox.labels_of(id);
            assert!(labels.contains("INBOX"));
            assert!(labels.contains("Mailroom/UPDATES"));
            assert!(!labels.contains("Mailroom/Auto-Responded"));
        }

        let state = h.sync_state().await;
        assert_eq!(state.last_message_received_at, Some(t3));
        assert_eq!(state.total_messages_synced, 3);
    }

    #[tokio::test]
    async fn test_second_cycle_is_idempotent() {
        let h = Harness::new().await;
        let t = Utc::now() - ChronoDuration::minutes(5);
        h.mailbox.seed(inbound("m1", "t1", "a@example.com", t));
        h.mailbox.seed(inbound("m2", "t2", "b@example.com", t));

        let first = h.pipeline.poll_mailbox(MAILBOX_ID).await;
        assert_eq!(first.messages_processed, 2);
        assert_eq!(first.cards_created, 2);

        // The fake provider hands the same ids back; dedupe by id makes the
        // re-run a no-op.
        let second = h.pipeline.poll_mailbox(MAILBOX_ID).await;
        assert!(second.success);
        assert_eq!(second.messages_processed, 0);
        assert_eq!(second.cards_created, 0);
        assert!(second.errors.is_empty());

        assert_eq!(h.messages.count().await, 2);
        assert_eq!(h.cards.all().await.len(), 2);
        assert_eq!(h.sync_state().await.total_messages_synced, 2);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_isolated() {
        let h = Harness::new().await;
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        for i in 1..=5 {
            h.mailbox.seed(inbound(
                &format!("m{i}"),
                &format!("t{i}"),
                "a@example.com",
                base + ChronoDuration::minutes(i),
            ));
        }
        h.classifier.fail_on("m3");

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.messages_processed, 4);
        assert_eq!(result.cards_created, 4);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message_id.as_deref(), Some("m3"));
        assert_eq!(result.errors[0].stage, PollStage::Classify);

        // The failed message is persisted without a classification, ready
        // for a later pass.
        let stranded = h.messages.find(MAILBOX_ID, "m3").await.unwrap().unwrap();
        assert!(stranded.classification.is_none());
        assert!(stranded.processed_at.is_none());

        // Cursor still advances over the whole observed batch.
        let state = h.sync_state().await;
        assert_eq!(
            state.last_message_received_at,
            Some(base + ChronoDuration::minutes(5))
        );
    }

    #[tokio::test]
    async fn test_fetch_and_parse_failures_are_isolated() {
        let h = Harness::new().await;
        let t = Utc::now() - ChronoDuration::minutes(30);
        h.mailbox.seed(inbound("ok", "t1", "a@example.com", t));
        h.mailbox.seed(inbound("gone", "t2", "a@example.com", t));
        h.mailbox.seed(inbound("garbled", "t3", "a@example.com", t));
        h.mailbox.fail_fetch.lock().unwrap().insert("gone".to_string());
        h.mailbox
            .unparsable
            .lock()
            .unwrap()
            .insert("garbled".to_string());

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.messages_processed, 1);
        assert_eq!(result.errors.len(), 2);
        let stages: Vec<PollStage> = result.errors.iter().map(|e| e.stage).collect();
        assert!(stages.contains(&PollStage::Fetch));
        assert!(stages.contains(&PollStage::Parse));
    }

    #[tokio::test]
    async fn test_campaign_reply_correlates_to_latest_send() {
        let h = Harness::new().await;
        let t1 = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 5, 8, 8, 0, 0).unwrap();
        h.cards
            .push(executed_send("t-camp", Some("job-1"), t1, "initial outreach"))
            .await;
        h.cards
            .push(executed_send("t-camp", Some("job-1"), t2, "follow-up"))
            .await;
        h.jobs
            .put(
                "job-1",
                JobSummary {
                    name: "Spring outreach".to_string(),
                    description: "Warm leads".to_string(),
                },
            )
            .await;
        h.mailbox.seed(inbound(
            "reply-1",
            "t-camp",
            "dana@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;
        assert!(result.success);
        assert_eq!(result.messages_processed, 1);

        // The classifier saw the campaign context of the most recent send.
        let campaigns = h.classifier.seen_campaigns.lock().unwrap().clone();
        let link = campaigns.get("reply-1").unwrap().as_ref().unwrap();
        assert!(link.is_campaign_reply);
        assert_eq!(link.job_id.as_deref(), Some("job-1"));
        let ctx = link.job_context.as_ref().unwrap();
        assert_eq!(ctx.original_email_subject, "follow-up");

        // Correlation is stored on the record and carried onto the card.
        let record = h
            .messages
            .find(MAILBOX_ID, "reply-1")
            .await
            .unwrap()
            .unwrap();
        assert!(record.correlation.as_ref().unwrap().is_campaign_reply);
        let cards = h.cards.all().await;
        let reply_card = cards
            .iter()
            .find(|c| c.source_message_id == "reply-1")
            .unwrap();
        assert_eq!(reply_card.job_id.as_deref(), Some("job-1"));
        assert_eq!(reply_card.task_id, Some(11));
    }

    #[tokio::test]
    async fn test_auto_executed_card_curates_the_inbox() {
        let h =
            Harness::with_default_classification(classification(Category::Status, 0.99)).await;
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "a@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.cards_created, 1);
        assert_eq!(result.auto_executed_cards, 1);

        let labels = h.mailbox.labels_of("m1");
        assert!(!labels.contains("INBOX"));
        assert!(!labels.contains("UNREAD"));
        assert!(labels.contains("Mailroom/STATUS"));
        assert!(labels.contains("Mailroom/Auto-Responded"));
    }

    #[tokio::test]
    async fn test_reviewed_card_leaves_the_inbox_alone() {
        let h = Harness::new().await;
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "a@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.auto_executed_cards, 0);
        let labels = h.mailbox.labels_of("m1");
        assert!(labels.contains("INBOX"));
        assert!(labels.contains("UNREAD"));
        assert!(!labels.contains("Mailroom/Auto-Responded"));
    }

    #[tokio::test]
    async fn test_escalation_invokes_notifier_and_stays_in_inbox() {
        let h =
            Harness::with_default_classification(classification(Category::Escalate, 0.99)).await;
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "a@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.auto_executed_cards, 0);
        assert_eq!(
            h.notifier.escalations.lock().unwrap().as_slice(),
            ["m1".to_string()]
        );
        assert!(h.mailbox.labels_of("m1").contains("INBOX"));
    }

    #[tokio::test]
    async fn test_expired_token_with_revoked_refresh_aborts_before_fetch() {
        let h = Harness::new().await;
        h.credentials
            .put(MailboxConnection {
                mailbox_id: MAILBOX_ID.to_string(),
                provider: "google".to_string(),
                access_token: "stale".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Utc::now() - ChronoDuration::minutes(5),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await;
        // StaticExchange defaults to the revoked outcome.
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "a@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].stage, PollStage::Connect);
        assert_eq!(result.messages_processed, 0);

        // No listing happened and the cursor did not move.
        assert!(h.mailbox.listed_since.lock().unwrap().is_empty());
        assert!(h.sync_state().await.last_sync_at.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_and_polls_with_new_token() {
        let h = Harness::new().await;
        h.credentials
            .put(MailboxConnection {
                mailbox_id: MAILBOX_ID.to_string(),
                provider: "google".to_string(),
                access_token: "stale".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Utc::now() - ChronoDuration::minutes(5),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await;
        *h.exchange.response.lock().unwrap() = Some(RefreshTokenResponse {
            access_token: "fresh-token".to_string(),
            expires_in: 3600,
            scope: None,
            token_type: None,
        });

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(
            h.connector.tokens_seen.lock().unwrap().as_slice(),
            ["fresh-token".to_string()]
        );
        use crate::store::CredentialStore;
        let stored = h
            .credentials
            .load_connection(MAILBOX_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token, "fresh-token");
        assert!(stored.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_disabled_mailbox_is_a_silent_noop() {
        let h = Harness::new().await;
        let mut state = SyncState::new(MAILBOX_ID);
        state.enabled = false;
        h.sync_states.put(state).await;
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "a@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.messages_processed, 0);
        assert!(result.errors.is_empty());
        assert!(h.mailbox.listed_since.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_mailbox_is_a_config_error() {
        let h = Harness::new().await;
        let result = h.pipeline.poll_mailbox("nobody").await;

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].stage, PollStage::Connect);
    }

    #[tokio::test]
    async fn test_auto_process_off_stores_without_cards() {
        let h = Harness::new().await;
        let mut state = SyncState::new(MAILBOX_ID);
        state.auto_process = false;
        h.sync_states.put(state).await;
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "a@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;

        assert!(result.success);
        assert_eq!(result.messages_processed, 1);
        assert_eq!(result.cards_created, 0);
        assert!(h.cards.all().await.is_empty());
        // The raw message is still ingested for later processing.
        assert_eq!(h.messages.count().await, 1);
    }

    #[tokio::test]
    async fn test_manual_sync_matches_poll_behavior() {
        let h = Harness::new().await;
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "a@example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.manual_sync(MAILBOX_ID).await;
        assert!(result.success);
        assert_eq!(result.messages_processed, 1);
        assert_eq!(result.cards_created, 1);
    }

    #[tokio::test]
    async fn test_sender_context_reaches_classifier() {
        let h = Harness::new().await;
        h.contacts
            .put(
                "dana@example.com",
                crate::store::ContactProfile {
                    client_id: Some("cl-9".to_string()),
                    has_active_orders: true,
                },
            )
            .await;
        h.mailbox.seed(inbound(
            "m1",
            "t1",
            "Dana@Example.com",
            Utc::now() - ChronoDuration::minutes(1),
        ));

        let result = h.pipeline.poll_mailbox(MAILBOX_ID).await;
        assert!(result.success);

        let contexts = h.classifier.seen_contexts.lock().unwrap().clone();
        let ctx = contexts.get("m1").unwrap();
        assert!(ctx.is_existing_client);
        assert!(ctx.has_active_orders);
    }
}
