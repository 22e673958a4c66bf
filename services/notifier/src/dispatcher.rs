//! Notification dispatch core
//!
//! `notify` resolves the user's active platform accounts, formats a
//! platform-appropriate message for each, and sends them concurrently
//! with an independent timeout per platform. Successful deliveries are
//! recorded through a conditional insert on the dedup key; losing the
//! insert race downgrades the outcome to `Skipped`.
//!
//! Sends run in spawned tasks, so an in-flight send and its record
//! write complete even if the calling future is cancelled.

use crate::adapter::{AdapterRegistry, PlatformAdapter};
use crate::config::DispatcherConfig;
use crate::format;
use crate::store::NotificationRecordStore;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use types::errors::{DispatchError, SendFailure};
use types::ids::{OpportunityId, UserId};
use types::notification::{DedupKey, DeliveryOutcome, DeliveryStatus, NotificationRecord};
use types::opportunity::Opportunity;
use types::platform::PlatformKind;
use types::profile::UserProfile;

/// Cross-platform notification dispatcher
pub struct Dispatcher {
    adapters: Arc<AdapterRegistry>,
    records: Arc<dyn NotificationRecordStore>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        adapters: Arc<AdapterRegistry>,
        records: Arc<dyn NotificationRecordStore>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            adapters,
            records,
            config,
        }
    }

    /// Deliver one logical notification to every active linked account
    ///
    /// Returns one outcome per account regardless of individual
    /// failures; fails only when the user has nothing to notify.
    pub async fn notify(
        &self,
        profile: &UserProfile,
        opportunity: &Opportunity,
    ) -> Result<Vec<DeliveryOutcome>, DispatchError> {
        let accounts: Vec<_> = profile.active_accounts().cloned().collect();
        if accounts.is_empty() {
            return Err(DispatchError::NoLinkedPlatforms {
                user_id: profile.user_id,
            });
        }

        debug!(
            user_id = %profile.user_id,
            opportunity_id = %opportunity.opportunity_id,
            platforms = accounts.len(),
            "Dispatching notification"
        );

        enum Slot {
            Ready(DeliveryOutcome),
            Pending(PlatformKind, usize),
        }

        let mut handles = Vec::with_capacity(accounts.len());
        let mut slots = Vec::with_capacity(accounts.len());

        for account in accounts {
            let key = DedupKey {
                user_id: profile.user_id,
                opportunity_id: opportunity.opportunity_id,
                platform: account.platform,
            };

            // Skip platforms already delivered; no send attempted
            if self.records.was_sent(&key).await {
                debug!(platform = %account.platform, "Already sent, skipping");
                slots.push(Slot::Ready(DeliveryOutcome::skipped(account.platform)));
                continue;
            }

            let Some(adapter) = self.adapters.get(account.platform) else {
                warn!(platform = %account.platform, "No adapter registered");
                let outcome = self
                    .record_failure(key, "no adapter registered for platform")
                    .await;
                slots.push(Slot::Ready(outcome));
                continue;
            };

            let message = format::opportunity_alert(opportunity, &adapter.capabilities());
            let records = Arc::clone(&self.records);
            let config = self.config.clone();
            let external_id = account.external_id.clone();

            // Spawned so the send and its record write survive caller
            // cancellation; the dedup invariant depends on the record
            // write completing.
            let handle = tokio::spawn(async move {
                deliver_one(adapter, records, config, key, external_id, message).await
            });
            slots.push(Slot::Pending(account.platform, handles.len()));
            handles.push(handle);
        }

        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Ready(outcome) => results.push(outcome),
                Slot::Pending(platform, index) => match &joined[index] {
                    Ok(outcome) => results.push(outcome.clone()),
                    Err(join_error) => {
                        // Task panicked; surface as a failed platform
                        warn!(%platform, error = %join_error, "Delivery task failed to complete");
                        results.push(DeliveryOutcome::failed(platform, join_error.to_string()));
                    }
                },
            }
        }

        info!(
            user_id = %profile.user_id,
            opportunity_id = %opportunity.opportunity_id,
            sent = results.iter().filter(|o| o.status == DeliveryStatus::Sent).count(),
            skipped = results.iter().filter(|o| o.status == DeliveryStatus::Skipped).count(),
            failed = results.iter().filter(|o| o.status == DeliveryStatus::Failed).count(),
            "Dispatch complete"
        );

        Ok(results)
    }

    /// React to re-approval of an edited opportunity
    ///
    /// Clears `Sent` records (allowing re-notification) only when
    /// `renotify_on_reapproval` is enabled; returns how many were
    /// cleared.
    pub async fn handle_reapproval(&self, opportunity_id: OpportunityId) -> usize {
        if !self.config.renotify_on_reapproval {
            return 0;
        }
        let cleared = self.records.reset_sent(opportunity_id).await;
        info!(%opportunity_id, cleared, "Cleared sent records after re-approval");
        cleared
    }

    /// Administrative delivery query for a (user, opportunity) pair
    pub async fn delivery_outcomes(
        &self,
        user_id: UserId,
        opportunity_id: OpportunityId,
    ) -> Vec<NotificationRecord> {
        self.records.outcomes_for(user_id, opportunity_id).await
    }

    async fn record_failure(&self, key: DedupKey, detail: &str) -> DeliveryOutcome {
        let mut record = NotificationRecord::new(
            key.user_id,
            key.opportunity_id,
            key.platform,
            DeliveryStatus::Failed,
            now_nanos(),
        );
        record.error_detail = Some(detail.to_string());
        self.records.insert_if_absent(record).await;
        DeliveryOutcome::failed(key.platform, detail)
    }
}

/// Send to one platform and record the outcome
async fn deliver_one(
    adapter: Arc<dyn PlatformAdapter>,
    records: Arc<dyn NotificationRecordStore>,
    config: DispatcherConfig,
    key: DedupKey,
    external_id: String,
    message: String,
) -> DeliveryOutcome {
    match send_with_retry(adapter.as_ref(), &config, &external_id, &message).await {
        Ok(()) => {
            let record = NotificationRecord::new(
                key.user_id,
                key.opportunity_id,
                key.platform,
                DeliveryStatus::Sent,
                now_nanos(),
            );
            if records.insert_if_absent(record).await {
                DeliveryOutcome::sent(key.platform)
            } else {
                // A concurrent caller recorded the send first; treat our
                // attempt as skipped rather than erroring.
                debug!(platform = %key.platform, "Lost sent-record race, downgrading to skipped");
                DeliveryOutcome::skipped(key.platform)
            }
        }
        Err(failure) => {
            warn!(
                platform = %key.platform,
                error = %failure,
                retryable = failure.is_retryable(),
                "Delivery failed"
            );
            let mut record = NotificationRecord::new(
                key.user_id,
                key.opportunity_id,
                key.platform,
                DeliveryStatus::Failed,
                now_nanos(),
            );
            record.error_detail = Some(failure.to_string());
            records.insert_if_absent(record).await;
            DeliveryOutcome::failed(key.platform, failure.to_string())
        }
    }
}

/// One send attempt plus the configured immediate-retry budget
///
/// Only retryable failures are retried, with exponential backoff.
/// Terminal failures and an exhausted budget report the last failure;
/// further retries belong to an external scheduler.
async fn send_with_retry(
    adapter: &dyn PlatformAdapter,
    config: &DispatcherConfig,
    external_id: &str,
    message: &str,
) -> Result<(), SendFailure> {
    let mut attempt: u32 = 0;
    loop {
        let failure = match timeout(config.send_timeout, adapter.send(external_id, message)).await
        {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(failure)) => failure,
            Err(_) => SendFailure::Timeout {
                waited_ms: config.send_timeout.as_millis() as u64,
            },
        };

        if !failure.is_retryable() || attempt >= config.immediate_retries {
            return Err(failure);
        }

        // Saturate instead of overflowing once the doubling factor
        // outgrows u32
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let backoff = config
            .retry_backoff
            .checked_mul(factor)
            .unwrap_or(Duration::MAX);
        debug!(attempt = attempt + 1, backoff_ms = backoff.as_millis() as u64, "Retrying send");
        sleep(backoff).await;
        attempt += 1;
    }
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::PlatformCapabilities;
    use crate::store::InMemoryNotificationRecordStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use types::opportunity::OpportunityType;
    use types::platform::PlatformAccount;
    use types::profile::UserKind;

    const T0: i64 = 1_700_000_000_000_000_000;

    /// Adapter that fails a configured number of times before succeeding
    struct FlakyAdapter {
        kind: PlatformKind,
        failures_remaining: AtomicU32,
        failure: SendFailure,
        sends: AtomicU32,
    }

    impl FlakyAdapter {
        fn reliable(kind: PlatformKind) -> Self {
            Self::failing(kind, 0, SendFailure::RateLimited)
        }

        fn failing(kind: PlatformKind, failures: u32, failure: SendFailure) -> Self {
            Self {
                kind,
                failures_remaining: AtomicU32::new(failures),
                failure,
                sends: AtomicU32::new(0),
            }
        }

        fn send_count(&self) -> u32 {
            self.sends.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlatformAdapter for FlakyAdapter {
        fn kind(&self) -> PlatformKind {
            self.kind
        }

        fn capabilities(&self) -> PlatformCapabilities {
            PlatformCapabilities {
                max_message_length: 4096,
                supports_rich_formatting: true,
            }
        }

        async fn send(&self, _external_id: &str, _message: &str) -> Result<(), SendFailure> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
                Err(self.failure.clone())
            } else {
                Ok(())
            }
        }
    }

    fn profile_with(platforms: &[PlatformKind]) -> UserProfile {
        let mut profile = UserProfile::new(UserKind::Student, "Test", T0);
        for (i, kind) in platforms.iter().enumerate() {
            profile.link_account(PlatformAccount::new(*kind, format!("ext-{i}"), T0), T0);
        }
        profile
    }

    fn opportunity() -> Opportunity {
        Opportunity::new(
            OpportunityType::Scholarship,
            "Test",
            "Org",
            UserId::new(),
            T0,
        )
    }

    fn dispatcher_with(
        adapters: Vec<Arc<dyn PlatformAdapter>>,
        records: Arc<InMemoryNotificationRecordStore>,
        config: DispatcherConfig,
    ) -> Dispatcher {
        let mut registry = AdapterRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        Dispatcher::new(Arc::new(registry), records, config)
    }

    fn fast_config() -> DispatcherConfig {
        DispatcherConfig {
            send_timeout: Duration::from_millis(200),
            immediate_retries: 1,
            retry_backoff: Duration::from_millis(1),
            renotify_on_reapproval: false,
        }
    }

    #[tokio::test]
    async fn test_no_linked_platforms_is_dispatch_error() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let dispatcher = dispatcher_with(vec![], Arc::clone(&records), fast_config());

        let profile = profile_with(&[]);
        let err = dispatcher.notify(&profile, &opportunity()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoLinkedPlatforms { .. }));
        assert_eq!(records.sent_count(), 0, "no records written");
    }

    #[tokio::test]
    async fn test_inactive_accounts_do_not_count() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let adapter = Arc::new(FlakyAdapter::reliable(PlatformKind::Telegram));
        let dispatcher = dispatcher_with(vec![adapter], records, fast_config());

        let mut profile = profile_with(&[PlatformKind::Telegram]);
        profile.accounts[0].is_active = false;

        let err = dispatcher.notify(&profile, &opportunity()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoLinkedPlatforms { .. }));
    }

    #[tokio::test]
    async fn test_successful_delivery_all_platforms() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let dispatcher = dispatcher_with(
            vec![
                Arc::new(FlakyAdapter::reliable(PlatformKind::Telegram)),
                Arc::new(FlakyAdapter::reliable(PlatformKind::Discord)),
            ],
            Arc::clone(&records),
            fast_config(),
        );

        let profile = profile_with(&[PlatformKind::Telegram, PlatformKind::Discord]);
        let outcomes = dispatcher.notify(&profile, &opportunity()).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == DeliveryStatus::Sent));
        assert_eq!(records.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_second_notify_skips_sent_platforms() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let adapter = Arc::new(FlakyAdapter::reliable(PlatformKind::Telegram));
        let dispatcher = dispatcher_with(
            vec![Arc::clone(&adapter) as Arc<dyn PlatformAdapter>],
            Arc::clone(&records),
            fast_config(),
        );

        let profile = profile_with(&[PlatformKind::Telegram]);
        let opp = opportunity();

        let first = dispatcher.notify(&profile, &opp).await.unwrap();
        assert_eq!(first[0].status, DeliveryStatus::Sent);

        let second = dispatcher.notify(&profile, &opp).await.unwrap();
        assert_eq!(second[0].status, DeliveryStatus::Skipped);

        assert_eq!(adapter.send_count(), 1, "no send attempted on skip");
        assert_eq!(records.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_block_other_platforms() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let dispatcher = dispatcher_with(
            vec![
                Arc::new(FlakyAdapter::reliable(PlatformKind::Telegram)),
                Arc::new(FlakyAdapter::failing(
                    PlatformKind::Discord,
                    u32::MAX,
                    SendFailure::AccountUnlinked,
                )),
            ],
            Arc::clone(&records),
            fast_config(),
        );

        let profile = profile_with(&[PlatformKind::Telegram, PlatformKind::Discord]);
        let outcomes = dispatcher.notify(&profile, &opportunity()).await.unwrap();

        let telegram = outcomes
            .iter()
            .find(|o| o.platform == PlatformKind::Telegram)
            .unwrap();
        let discord = outcomes
            .iter()
            .find(|o| o.platform == PlatformKind::Discord)
            .unwrap();

        assert_eq!(telegram.status, DeliveryStatus::Sent);
        assert_eq!(discord.status, DeliveryStatus::Failed);
        assert!(discord.error_detail.is_some());
        assert_eq!(records.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried_within_budget() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let adapter = Arc::new(FlakyAdapter::failing(
            PlatformKind::Telegram,
            1,
            SendFailure::RateLimited,
        ));
        let dispatcher = dispatcher_with(
            vec![Arc::clone(&adapter) as Arc<dyn PlatformAdapter>],
            records,
            fast_config(),
        );

        let profile = profile_with(&[PlatformKind::Telegram]);
        let outcomes = dispatcher.notify(&profile, &opportunity()).await.unwrap();

        assert_eq!(outcomes[0].status, DeliveryStatus::Sent);
        assert_eq!(adapter.send_count(), 2, "one failure plus one retry");
    }

    #[tokio::test]
    async fn test_terminal_failure_is_not_retried() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let adapter = Arc::new(FlakyAdapter::failing(
            PlatformKind::Telegram,
            u32::MAX,
            SendFailure::InvalidTarget {
                external_id: "ext-0".to_string(),
            },
        ));
        let dispatcher = dispatcher_with(
            vec![Arc::clone(&adapter) as Arc<dyn PlatformAdapter>],
            records,
            fast_config(),
        );

        let profile = profile_with(&[PlatformKind::Telegram]);
        let outcomes = dispatcher.notify(&profile, &opportunity()).await.unwrap();

        assert_eq!(outcomes[0].status, DeliveryStatus::Failed);
        assert_eq!(adapter.send_count(), 1, "terminal failures get no retry");
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_reports_failure() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let adapter = Arc::new(FlakyAdapter::failing(
            PlatformKind::Telegram,
            u32::MAX,
            SendFailure::RateLimited,
        ));
        let config = DispatcherConfig {
            immediate_retries: 2,
            ..fast_config()
        };
        let dispatcher = dispatcher_with(
            vec![Arc::clone(&adapter) as Arc<dyn PlatformAdapter>],
            Arc::clone(&records),
            config,
        );

        let profile = profile_with(&[PlatformKind::Telegram]);
        let outcomes = dispatcher.notify(&profile, &opportunity()).await.unwrap();

        assert_eq!(outcomes[0].status, DeliveryStatus::Failed);
        assert_eq!(adapter.send_count(), 3, "initial attempt plus two retries");
        assert_eq!(records.sent_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_saturates_on_large_retry_budget() {
        // A budget past 31 retries would overflow the doubling factor;
        // it must saturate instead. Paused time fast-forwards the
        // multi-day backoffs.
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let adapter = Arc::new(FlakyAdapter::failing(
            PlatformKind::Telegram,
            u32::MAX,
            SendFailure::RateLimited,
        ));
        let config = DispatcherConfig {
            immediate_retries: 35,
            ..fast_config()
        };
        let dispatcher = dispatcher_with(
            vec![Arc::clone(&adapter) as Arc<dyn PlatformAdapter>],
            records,
            config,
        );

        let profile = profile_with(&[PlatformKind::Telegram]);
        let outcomes = dispatcher.notify(&profile, &opportunity()).await.unwrap();

        assert_eq!(outcomes[0].status, DeliveryStatus::Failed);
        assert_eq!(adapter.send_count(), 36, "initial attempt plus every retry");
    }

    #[tokio::test]
    async fn test_missing_adapter_reports_failed_outcome() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let dispatcher = dispatcher_with(vec![], Arc::clone(&records), fast_config());

        let profile = profile_with(&[PlatformKind::Whatsapp]);
        let outcomes = dispatcher.notify(&profile, &opportunity()).await.unwrap();

        assert_eq!(outcomes[0].status, DeliveryStatus::Failed);
        assert!(outcomes[0]
            .error_detail
            .as_deref()
            .unwrap()
            .contains("no adapter"));
    }

    #[tokio::test]
    async fn test_reapproval_respects_config_flag() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let adapter = Arc::new(FlakyAdapter::reliable(PlatformKind::Telegram));
        let opp = opportunity();
        let profile = profile_with(&[PlatformKind::Telegram]);

        // Default: no reset
        let dispatcher = dispatcher_with(
            vec![Arc::clone(&adapter) as Arc<dyn PlatformAdapter>],
            Arc::clone(&records),
            fast_config(),
        );
        dispatcher.notify(&profile, &opp).await.unwrap();
        assert_eq!(dispatcher.handle_reapproval(opp.opportunity_id).await, 0);
        assert_eq!(records.sent_count(), 1);

        // Enabled: sent records cleared, re-notify delivers again
        let config = DispatcherConfig {
            renotify_on_reapproval: true,
            ..fast_config()
        };
        let dispatcher = dispatcher_with(
            vec![Arc::clone(&adapter) as Arc<dyn PlatformAdapter>],
            Arc::clone(&records),
            config,
        );
        assert_eq!(dispatcher.handle_reapproval(opp.opportunity_id).await, 1);
        let outcomes = dispatcher.notify(&profile, &opp).await.unwrap();
        assert_eq!(outcomes[0].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_delivery_outcomes_query() {
        let records = Arc::new(InMemoryNotificationRecordStore::new());
        let dispatcher = dispatcher_with(
            vec![
                Arc::new(FlakyAdapter::reliable(PlatformKind::Telegram)),
                Arc::new(FlakyAdapter::failing(
                    PlatformKind::Discord,
                    u32::MAX,
                    SendFailure::AccountUnlinked,
                )),
            ],
            records,
            fast_config(),
        );

        let profile = profile_with(&[PlatformKind::Telegram, PlatformKind::Discord]);
        let opp = opportunity();
        dispatcher.notify(&profile, &opp).await.unwrap();

        let recorded = dispatcher
            .delivery_outcomes(profile.user_id, opp.opportunity_id)
            .await;
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().any(|r| r.status == DeliveryStatus::Sent));
        assert!(recorded.iter().any(|r| r.status == DeliveryStatus::Failed));
    }
}
