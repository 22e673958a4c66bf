//! Individual scoring signals
//!
//! One function per signal in the additive model. Neutral signals
//! (education level, location) only score when the profile expresses
//! the preference, so a profile with nothing set scores on recency
//! alone.

use crate::config::MatchWeights;
use types::opportunity::Opportunity;
use types::profile::UserProfile;

const NANOS_PER_DAY: f64 = 86_400.0 * 1_000_000_000.0;

/// Degree of field-of-study match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMatch {
    /// Normalized strings are equal
    Exact,
    /// One normalized string contains the other
    Partial,
    None,
}

/// Interest-tag overlap ratio: `|interests ∩ tags| / max(1, |tags|)`
pub fn tag_overlap(profile: &UserProfile, opportunity: &Opportunity) -> f64 {
    let overlap = profile
        .interests
        .intersection(&opportunity.tags)
        .count();
    overlap as f64 / opportunity.tags.len().max(1) as f64
}

/// Whether the profile's education level is admitted
///
/// Requires the profile to state a level; an opportunity with an empty
/// required set then admits it.
pub fn level_matches(profile: &UserProfile, opportunity: &Opportunity) -> bool {
    profile.education_level.is_some() && opportunity.admits_level(profile.education_level)
}

/// Compare normalized fields of study
pub fn field_match(profile: &UserProfile, opportunity: &Opportunity) -> FieldMatch {
    let (Some(profile_field), Some(opp_field)) =
        (profile.normalized_field(), opportunity.normalized_field())
    else {
        return FieldMatch::None;
    };
    if profile_field == opp_field {
        FieldMatch::Exact
    } else if profile_field.contains(&opp_field) || opp_field.contains(&profile_field) {
        FieldMatch::Partial
    } else {
        FieldMatch::None
    }
}

/// Whether the locations match
///
/// Requires the profile to state a location; it then matches an equal
/// location (case-insensitive) or an opportunity with no location
/// constraint.
pub fn location_matches(profile: &UserProfile, opportunity: &Opportunity) -> bool {
    let Some(profile_location) = profile.location.as_deref() else {
        return false;
    };
    match opportunity.location.as_deref() {
        Some(opp_location) => profile_location.eq_ignore_ascii_case(opp_location),
        None => true,
    }
}

/// Recency decay: `exp(-age_days / half_life_days)`, age clamped to ≥ 0
pub fn recency(posted_at: i64, now: i64, half_life_days: f64) -> f64 {
    let age_days = ((now - posted_at).max(0)) as f64 / NANOS_PER_DAY;
    (-age_days / half_life_days).exp()
}

/// Total score for one (profile, opportunity) pair
///
/// Additive over the independent signals. The caller has already
/// excluded past-deadline opportunities.
pub fn score(
    profile: &UserProfile,
    opportunity: &Opportunity,
    now: i64,
    weights: &MatchWeights,
) -> f64 {
    let mut total = weights.w_tag * tag_overlap(profile, opportunity);

    if level_matches(profile, opportunity) {
        total += weights.w_level;
    }

    total += match field_match(profile, opportunity) {
        FieldMatch::Exact => weights.w_field,
        FieldMatch::Partial => 0.5 * weights.w_field,
        FieldMatch::None => 0.0,
    };

    if location_matches(profile, opportunity) {
        total += weights.w_location;
    }

    total += weights.w_recency * recency(opportunity.posted_at, now, weights.half_life_days);

    total
}
