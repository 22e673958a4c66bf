//! Scoring weight configuration
//!
//! Every weight in the additive scoring model is a configuration
//! constant rather than a hardcoded value.

use serde::{Deserialize, Serialize};

/// Weights for the additive scoring model
///
/// Each signal is independent; the final score is the sum of the
/// weighted signals that apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    /// Weight of the interest-tag overlap ratio
    pub w_tag: f64,
    /// Weight granted on an education-level match
    pub w_level: f64,
    /// Weight granted on a field-of-study match (half on substring)
    pub w_field: f64,
    /// Weight granted on a location match
    pub w_location: f64,
    /// Weight of the recency decay component
    pub w_recency: f64,
    /// Half-life of the recency decay, in days
    pub half_life_days: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            w_tag: 10.0,
            w_level: 5.0,
            w_field: 5.0,
            w_location: 3.0,
            w_recency: 2.0,
            half_life_days: 30.0,
        }
    }
}
