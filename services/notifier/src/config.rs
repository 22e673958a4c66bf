//! Dispatcher and sweep configuration
//!
//! Every tunable the delivery policy depends on is a field here rather
//! than a hardcoded constant.

use matching_engine::MatchWeights;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delivery policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Independent timeout applied to each platform send
    pub send_timeout: Duration,
    /// Immediate in-call retries for retryable failures; further
    /// retries belong to an external scheduler
    pub immediate_retries: u32,
    /// Base backoff before the first retry, doubled per attempt
    pub retry_backoff: Duration,
    /// Whether re-approval of an edited opportunity clears `Sent`
    /// records and allows re-notification
    pub renotify_on_reapproval: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(5),
            immediate_retries: 1,
            retry_backoff: Duration::from_millis(250),
            renotify_on_reapproval: false,
        }
    }
}

/// Batch sweep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Minimum engine score an opportunity must reach to be dispatched
    pub min_score: f64,
    /// Scoring weights fed to the matching engine
    pub weights: MatchWeights,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_score: 1.0,
            weights: MatchWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dispatcher_config() {
        let config = DispatcherConfig::default();
        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert_eq!(config.immediate_retries, 1);
        assert!(!config.renotify_on_reapproval, "no re-notify by default");
    }

    #[test]
    fn test_sweep_config_roundtrip() {
        let config = SweepConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SweepConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
