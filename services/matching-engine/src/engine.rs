//! Ranking entry point
//!
//! `rank` is a pure function of (profile, opportunity pool, now). The
//! caller supplies a pool already filtered to approved opportunities;
//! approval state is not re-checked here.

use crate::config::MatchWeights;
use crate::scoring;
use serde::{Deserialize, Serialize};
use types::errors::MatchError;
use types::opportunity::Opportunity;
use types::profile::UserProfile;

/// An opportunity with its computed relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOpportunity {
    pub opportunity: Opportunity,
    pub score: f64,
}

/// Rank opportunities for a profile, best first
///
/// Ordered descending by score; ties broken by more recent posting
/// timestamp, then by stable input order. Opportunities whose deadline
/// is strictly in the past are excluded entirely. An empty pool yields
/// an empty result.
///
/// Fails only on malformed arguments (`now` must be a positive Unix
/// nanos timestamp); sparse profiles degrade to fewer scoring signals.
pub fn rank(
    profile: &UserProfile,
    opportunities: &[Opportunity],
    now: i64,
    weights: &MatchWeights,
) -> Result<Vec<RankedOpportunity>, MatchError> {
    if now <= 0 {
        return Err(MatchError::InvalidInput {
            reason: format!("now must be a positive Unix nanos timestamp, got {now}"),
        });
    }

    let mut ranked: Vec<RankedOpportunity> = opportunities
        .iter()
        .filter(|opp| opp.is_open(now))
        .map(|opp| RankedOpportunity {
            opportunity: opp.clone(),
            score: scoring::score(profile, opp, now, weights),
        })
        .collect();

    // Stable sort keeps input order for exact (score, posted_at) ties
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.opportunity.posted_at.cmp(&a.opportunity.posted_at))
    });

    Ok(ranked)
}
