//! Collaborator store interfaces and in-memory implementations
//!
//! The dispatcher and sweep depend on these traits only; the in-memory
//! implementations back tests and single-process deployments. The one
//! hard requirement is on the notification record store: creating a
//! `Sent` record must be a conditional insert on the dedup key, not a
//! check-then-insert.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;
use types::ids::{OpportunityId, UserId};
use types::notification::{DedupKey, DeliveryStatus, NotificationRecord};
use types::opportunity::{ApprovalState, Opportunity, OpportunityType};
use types::profile::UserProfile;
use types::subscription::Subscription;

/// Read access to user profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Option<UserProfile>;
    async fn list_active_profiles(&self) -> Vec<UserProfile>;
}

/// Read access to the approved opportunity pool
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Approved opportunities, optionally narrowed to one type
    async fn list_approved(&self, filter: Option<OpportunityType>) -> Vec<Opportunity>;
}

/// Explicit (user, opportunity) interest records
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Idempotent: returns `false` without changes when an active
    /// subscription already exists
    async fn subscribe(&self, user_id: UserId, opportunity_id: OpportunityId, timestamp: i64)
        -> bool;

    /// Soft-deactivate; returns whether an active subscription existed
    async fn unsubscribe(&self, user_id: UserId, opportunity_id: OpportunityId) -> bool;

    async fn is_subscribed(&self, user_id: UserId, opportunity_id: OpportunityId) -> bool;

    async fn subscribers_of(&self, opportunity_id: OpportunityId) -> Vec<UserId>;
}

/// Delivery record store guarding the dedup invariant
#[async_trait]
pub trait NotificationRecordStore: Send + Sync {
    /// Insert a record
    ///
    /// For `Sent` records the insert is conditional on the dedup key:
    /// returns `false` (and stores nothing) when a `Sent` record for
    /// the key already exists. `Failed` and `Skipped` records are
    /// history and always stored.
    async fn insert_if_absent(&self, record: NotificationRecord) -> bool;

    /// Whether a `Sent` record exists for the key
    async fn was_sent(&self, key: &DedupKey) -> bool;

    /// All recorded attempts for a (user, opportunity) pair, for
    /// administrative delivery queries
    async fn outcomes_for(
        &self,
        user_id: UserId,
        opportunity_id: OpportunityId,
    ) -> Vec<NotificationRecord>;

    /// Clear `Sent` records for an opportunity, allowing re-delivery.
    /// Returns the number of records cleared.
    async fn reset_sent(&self, opportunity_id: OpportunityId) -> usize;
}

/// In-memory profile store
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<UserId, UserProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: UserProfile) {
        self.profiles.insert(profile.user_id, profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.profiles.get(&user_id).map(|p| p.clone())
    }

    async fn list_active_profiles(&self) -> Vec<UserProfile> {
        let mut profiles: Vec<UserProfile> = self
            .profiles
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.clone())
            .collect();
        // Deterministic iteration order for reproducible sweeps
        profiles.sort_by_key(|p| p.user_id);
        profiles
    }
}

/// In-memory opportunity store
#[derive(Default)]
pub struct InMemoryOpportunityStore {
    opportunities: DashMap<OpportunityId, Opportunity>,
}

impl InMemoryOpportunityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, opportunity: Opportunity) {
        self.opportunities
            .insert(opportunity.opportunity_id, opportunity);
    }
}

#[async_trait]
impl OpportunityStore for InMemoryOpportunityStore {
    async fn list_approved(&self, filter: Option<OpportunityType>) -> Vec<Opportunity> {
        let mut approved: Vec<Opportunity> = self
            .opportunities
            .iter()
            .filter(|o| o.approval == ApprovalState::Approved)
            .filter(|o| filter.map_or(true, |t| o.opportunity_type == t))
            .map(|o| o.clone())
            .collect();
        approved.sort_by_key(|o| o.opportunity_id);
        approved
    }
}

/// In-memory subscription store
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: DashMap<(UserId, OpportunityId), Subscription>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn subscribe(
        &self,
        user_id: UserId,
        opportunity_id: OpportunityId,
        timestamp: i64,
    ) -> bool {
        match self.subscriptions.entry((user_id, opportunity_id)) {
            dashmap::mapref::entry::Entry::Occupied(mut existing) => {
                let sub = existing.get_mut();
                if sub.is_active {
                    // Re-subscribe is a no-op
                    false
                } else {
                    sub.is_active = true;
                    sub.created_at = timestamp;
                    true
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Subscription::new(user_id, opportunity_id, timestamp));
                true
            }
        }
    }

    async fn unsubscribe(&self, user_id: UserId, opportunity_id: OpportunityId) -> bool {
        match self.subscriptions.get_mut(&(user_id, opportunity_id)) {
            Some(mut sub) if sub.is_active => {
                sub.is_active = false;
                true
            }
            _ => false,
        }
    }

    async fn is_subscribed(&self, user_id: UserId, opportunity_id: OpportunityId) -> bool {
        self.subscriptions
            .get(&(user_id, opportunity_id))
            .map(|s| s.is_active)
            .unwrap_or(false)
    }

    async fn subscribers_of(&self, opportunity_id: OpportunityId) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .subscriptions
            .iter()
            .filter(|s| s.opportunity_id == opportunity_id && s.is_active)
            .map(|s| s.user_id)
            .collect();
        users.sort();
        users
    }
}

/// In-memory notification record store
///
/// `Sent` records live in a keyed map whose entry API provides the
/// atomic insert-if-absent; failed and skipped attempts are appended to
/// a history log alongside.
#[derive(Default)]
pub struct InMemoryNotificationRecordStore {
    sent: DashMap<DedupKey, NotificationRecord>,
    history: Mutex<Vec<NotificationRecord>>,
}

impl InMemoryNotificationRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `Sent` records currently held
    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }
}

#[async_trait]
impl NotificationRecordStore for InMemoryNotificationRecordStore {
    async fn insert_if_absent(&self, record: NotificationRecord) -> bool {
        if record.status != DeliveryStatus::Sent {
            if let Ok(mut history) = self.history.lock() {
                history.push(record);
            }
            return true;
        }

        let key = record.key();
        match self.sent.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    async fn was_sent(&self, key: &DedupKey) -> bool {
        self.sent.contains_key(key)
    }

    async fn outcomes_for(
        &self,
        user_id: UserId,
        opportunity_id: OpportunityId,
    ) -> Vec<NotificationRecord> {
        let mut records: Vec<NotificationRecord> = self
            .sent
            .iter()
            .filter(|r| r.user_id == user_id && r.opportunity_id == opportunity_id)
            .map(|r| r.clone())
            .collect();
        if let Ok(history) = self.history.lock() {
            records.extend(
                history
                    .iter()
                    .filter(|r| r.user_id == user_id && r.opportunity_id == opportunity_id)
                    .cloned(),
            );
        }
        records.sort_by_key(|r| r.recorded_at);
        records
    }

    async fn reset_sent(&self, opportunity_id: OpportunityId) -> usize {
        // The map key is the record's dedup key
        let keys: Vec<DedupKey> = self
            .sent
            .iter()
            .filter(|r| r.opportunity_id == opportunity_id)
            .map(|r| *r.key())
            .collect();
        for key in &keys {
            self.sent.remove(key);
        }
        keys.len()
    }
}
