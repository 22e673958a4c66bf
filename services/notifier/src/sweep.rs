//! Batch notification sweep
//!
//! Feeds every active profile through the matching engine against the
//! approved opportunity pool and dispatches candidates whose score
//! reaches the configured threshold. Safe to run concurrently with
//! itself and with direct `notify` calls: the record store's
//! conditional insert is what guarantees at-most-one `Sent` per
//! platform, not the sweep.

use crate::config::SweepConfig;
use crate::dispatcher::Dispatcher;
use crate::store::{OpportunityStore, ProfileStore};
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::errors::{DispatchError, MatchError};
use types::notification::DeliveryStatus;

/// Tallies from one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Active profiles evaluated
    pub users_considered: usize,
    /// (user, opportunity) pairs at or above the score threshold
    pub candidates: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Users whose dispatch failed for lack of linked platforms
    pub users_without_platforms: usize,
}

/// Scheduled batch pass over users and approved opportunities
pub struct Sweeper {
    profiles: Arc<dyn ProfileStore>,
    opportunities: Arc<dyn OpportunityStore>,
    dispatcher: Arc<Dispatcher>,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        opportunities: Arc<dyn OpportunityStore>,
        dispatcher: Arc<Dispatcher>,
        config: SweepConfig,
    ) -> Self {
        Self {
            profiles,
            opportunities,
            dispatcher,
            config,
        }
    }

    /// Run one sweep at the given timestamp
    ///
    /// Per-user dispatch problems are tallied, not propagated; only a
    /// malformed timestamp fails the whole pass.
    pub async fn run(&self, now: i64) -> Result<SweepSummary, MatchError> {
        let pool = self.opportunities.list_approved(None).await;
        let profiles = self.profiles.list_active_profiles().await;

        info!(
            users = profiles.len(),
            pool = pool.len(),
            min_score = self.config.min_score,
            "Starting notification sweep"
        );

        let mut summary = SweepSummary::default();

        for profile in profiles {
            summary.users_considered += 1;

            let ranked = matching_engine::rank(&profile, &pool, now, &self.config.weights)?;

            for candidate in ranked
                .iter()
                .take_while(|r| r.score >= self.config.min_score)
            {
                summary.candidates += 1;
                debug!(
                    user_id = %profile.user_id,
                    opportunity_id = %candidate.opportunity.opportunity_id,
                    score = candidate.score,
                    "Dispatching sweep candidate"
                );

                match self
                    .dispatcher
                    .notify(&profile, &candidate.opportunity)
                    .await
                {
                    Ok(outcomes) => {
                        for outcome in outcomes {
                            match outcome.status {
                                DeliveryStatus::Sent => summary.sent += 1,
                                DeliveryStatus::Skipped => summary.skipped += 1,
                                DeliveryStatus::Failed => summary.failed += 1,
                            }
                        }
                    }
                    Err(DispatchError::NoLinkedPlatforms { user_id }) => {
                        warn!(%user_id, "Active user has no linked platforms");
                        summary.users_without_platforms += 1;
                        // Remaining candidates for this user would fail
                        // identically
                        break;
                    }
                }
            }
        }

        info!(
            users = summary.users_considered,
            candidates = summary.candidates,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "Sweep complete"
        );

        Ok(summary)
    }
}
