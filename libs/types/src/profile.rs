//! User profiles and matching preferences
//!
//! A profile carries the preference signals the matching engine scores
//! against (interests, education level, field of study, location) plus
//! the set of linked platform accounts the dispatcher delivers to.
//! Profiles are never deleted, only deactivated.

use crate::ids::UserId;
use crate::platform::{PlatformAccount, PlatformKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Education level of a student profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    Primary,
    Secondary,
    Undergraduate,
    Graduate,
    Professional,
    Other,
}

/// Role of a user within the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Student,
    Sponsor,
    Mentor,
    Admin,
}

/// Complete user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub kind: UserKind,
    pub display_name: String,
    /// Preferred language code (e.g. "en", "fr")
    pub language: String,
    /// Interest tags, normalized lowercase
    pub interests: BTreeSet<String>,
    pub education_level: Option<EducationLevel>,
    /// Free-text field of study; compared case-insensitively
    pub field_of_study: Option<String>,
    /// Free text or coarse region; compared case-insensitively
    pub location: Option<String>,
    pub accounts: Vec<PlatformAccount>,
    pub is_active: bool,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl UserProfile {
    /// Create a new active profile with no preferences or linked accounts
    pub fn new(kind: UserKind, display_name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user_id: UserId::new(),
            kind,
            display_name: display_name.into(),
            language: "en".to_string(),
            interests: BTreeSet::new(),
            education_level: None,
            field_of_study: None,
            location: None,
            accounts: Vec::new(),
            is_active: true,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Whether any matching preference is set
    pub fn has_any_preference(&self) -> bool {
        !self.interests.is_empty()
            || self.education_level.is_some()
            || self.field_of_study.is_some()
            || self.location.is_some()
    }

    /// Field of study normalized for comparison
    pub fn normalized_field(&self) -> Option<String> {
        self.field_of_study
            .as_deref()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
    }

    /// Linked accounts that are currently active
    pub fn active_accounts(&self) -> impl Iterator<Item = &PlatformAccount> {
        self.accounts.iter().filter(|a| a.is_active)
    }

    /// Link a platform account
    ///
    /// Returns `false` without linking if an account with the same
    /// `(platform, external_id)` identity is already attached.
    pub fn link_account(&mut self, account: PlatformAccount, timestamp: i64) -> bool {
        let identity = (account.platform, account.external_id.clone());
        if self
            .accounts
            .iter()
            .any(|a| a.identity() == (identity.0, identity.1.as_str()))
        {
            return false;
        }
        self.accounts.push(account);
        self.updated_at = timestamp;
        true
    }

    /// Remove a linked account by identity; returns whether one was removed
    pub fn unlink_account(
        &mut self,
        platform: PlatformKind,
        external_id: &str,
        timestamp: i64,
    ) -> bool {
        let before = self.accounts.len();
        self.accounts
            .retain(|a| a.identity() != (platform, external_id));
        let removed = self.accounts.len() < before;
        if removed {
            self.updated_at = timestamp;
        }
        removed
    }

    /// Deactivate the profile (profiles are never deleted)
    pub fn deactivate(&mut self, timestamp: i64) {
        self.is_active = false;
        self.updated_at = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile::new(UserKind::Student, "Amina", 1_700_000_000_000_000_000)
    }

    #[test]
    fn test_new_profile_has_no_preferences() {
        let p = profile();
        assert!(!p.has_any_preference());
        assert!(p.is_active);
        assert_eq!(p.active_accounts().count(), 0);
    }

    #[test]
    fn test_has_any_preference() {
        let mut p = profile();
        p.interests.insert("math".to_string());
        assert!(p.has_any_preference());

        let mut p = profile();
        p.education_level = Some(EducationLevel::Undergraduate);
        assert!(p.has_any_preference());
    }

    #[test]
    fn test_normalized_field() {
        let mut p = profile();
        p.field_of_study = Some("  Computer Science ".to_string());
        assert_eq!(p.normalized_field(), Some("computer science".to_string()));

        p.field_of_study = Some("   ".to_string());
        assert_eq!(p.normalized_field(), None);
    }

    #[test]
    fn test_link_account_rejects_duplicate_identity() {
        let mut p = profile();
        let account = PlatformAccount::new(PlatformKind::Telegram, "t-1", 2);
        assert!(p.link_account(account.clone(), 2));
        assert!(!p.link_account(account, 3), "duplicate identity rejected");
        assert_eq!(p.accounts.len(), 1);
    }

    #[test]
    fn test_link_second_account_on_same_platform() {
        // Only the (platform, external_id) identity is unique, not the
        // platform alone
        let mut p = profile();
        assert!(p.link_account(PlatformAccount::new(PlatformKind::Telegram, "t-1", 2), 2));
        assert!(p.link_account(PlatformAccount::new(PlatformKind::Telegram, "t-2", 3), 3));
        assert_eq!(p.accounts.len(), 2);
    }

    #[test]
    fn test_unlink_account() {
        let mut p = profile();
        p.link_account(PlatformAccount::new(PlatformKind::Telegram, "t-1", 2), 2);
        p.link_account(PlatformAccount::new(PlatformKind::Discord, "d-1", 3), 3);

        assert!(p.unlink_account(PlatformKind::Telegram, "t-1", 4));
        assert!(!p.unlink_account(PlatformKind::Telegram, "t-1", 5));
        assert_eq!(p.accounts.len(), 1);
    }

    #[test]
    fn test_active_accounts_excludes_inactive() {
        let mut p = profile();
        p.link_account(PlatformAccount::new(PlatformKind::Telegram, "t-1", 2), 2);
        let mut inactive = PlatformAccount::new(PlatformKind::Discord, "d-1", 3);
        inactive.is_active = false;
        p.link_account(inactive, 3);

        let active: Vec<_> = p.active_accounts().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].platform, PlatformKind::Telegram);
    }

    #[test]
    fn test_deactivate() {
        let mut p = profile();
        p.deactivate(9);
        assert!(!p.is_active);
        assert_eq!(p.updated_at, 9);
    }

    #[test]
    fn test_profile_serialization() {
        let mut p = profile();
        p.interests.insert("physics".to_string());
        p.education_level = Some(EducationLevel::Graduate);

        let json = serde_json::to_string(&p).unwrap();
        let deserialized: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(p, deserialized);
    }
}
