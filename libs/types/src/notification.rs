//! Delivery records, outcomes, and the dedup key
//!
//! The `(user, opportunity, platform)` triple is the dedup key: at most
//! one `Sent` record may ever exist for it. `Failed` and `Skipped`
//! records are history and do not consume the key.

use crate::ids::{OpportunityId, UserId};
use crate::platform::PlatformKind;
use serde::{Deserialize, Serialize};

/// Per-platform delivery status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Message delivered and recorded
    Sent,
    /// Send attempted and failed (detail recorded)
    Failed,
    /// No send attempted: already sent, or lost the insert race
    Skipped,
}

/// The at-most-one-sent uniqueness key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub user_id: UserId,
    pub opportunity_id: OpportunityId,
    pub platform: PlatformKind,
}

/// A recorded delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub user_id: UserId,
    pub opportunity_id: OpportunityId,
    pub platform: PlatformKind,
    pub status: DeliveryStatus,
    pub error_detail: Option<String>,
    pub recorded_at: i64, // Unix nanos
}

impl NotificationRecord {
    /// Create a record with the given status and no error detail
    pub fn new(
        user_id: UserId,
        opportunity_id: OpportunityId,
        platform: PlatformKind,
        status: DeliveryStatus,
        recorded_at: i64,
    ) -> Self {
        Self {
            user_id,
            opportunity_id,
            platform,
            status,
            error_detail: None,
            recorded_at,
        }
    }

    /// The dedup key of this record
    pub fn key(&self) -> DedupKey {
        DedupKey {
            user_id: self.user_id,
            opportunity_id: self.opportunity_id,
            platform: self.platform,
        }
    }
}

/// Per-platform result returned from a `notify` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub platform: PlatformKind,
    pub status: DeliveryStatus,
    pub error_detail: Option<String>,
}

impl DeliveryOutcome {
    pub fn sent(platform: PlatformKind) -> Self {
        Self {
            platform,
            status: DeliveryStatus::Sent,
            error_detail: None,
        }
    }

    pub fn skipped(platform: PlatformKind) -> Self {
        Self {
            platform,
            status: DeliveryStatus::Skipped,
            error_detail: None,
        }
    }

    pub fn failed(platform: PlatformKind, detail: impl Into<String>) -> Self {
        Self {
            platform,
            status: DeliveryStatus::Failed,
            error_detail: Some(detail.into()),
        }
    }
}
