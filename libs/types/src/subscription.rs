//! Explicit (user, opportunity) interest records
//!
//! Subscribing records explicit interest; creation is idempotent and
//! deletion is a soft deactivation that ends future notifications for
//! the pair. Idempotency is enforced by the owning store.

use crate::ids::{OpportunityId, UserId};
use serde::{Deserialize, Serialize};

/// A user's explicit interest in an opportunity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub opportunity_id: OpportunityId,
    pub created_at: i64, // Unix nanos
    pub is_active: bool,
}

impl Subscription {
    /// Create a new active subscription
    pub fn new(user_id: UserId, opportunity_id: OpportunityId, timestamp: i64) -> Self {
        Self {
            user_id,
            opportunity_id,
            created_at: timestamp,
            is_active: true,
        }
    }

    /// The unique (user, opportunity) pair
    pub fn key(&self) -> (UserId, OpportunityId) {
        (self.user_id, self.opportunity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_key() {
        let sub = Subscription::new(UserId::new(), OpportunityId::new(), 7);
        assert_eq!(sub.key(), (sub.user_id, sub.opportunity_id));
        assert!(sub.is_active);
    }

    #[test]
    fn test_subscription_serialization() {
        let sub = Subscription::new(UserId::new(), OpportunityId::new(), 7);
        let json = serde_json::to_string(&sub).unwrap();
        let deserialized: Subscription = serde_json::from_str(&json).unwrap();
        assert_eq!(sub, deserialized);
    }
}
