//! Chat platform kinds and linked platform accounts
//!
//! Users may link any number of accounts, including several on the same
//! platform. The `(platform, external_id)` pair is globally unique: one
//! external account belongs to exactly one user profile.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported chat platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Telegram,
    Discord,
    Whatsapp,
}

impl PlatformKind {
    /// All supported platforms, in a fixed order
    pub const ALL: [PlatformKind; 3] = [
        PlatformKind::Telegram,
        PlatformKind::Discord,
        PlatformKind::Whatsapp,
    ];

    /// Lowercase wire label for this platform
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Telegram => "telegram",
            PlatformKind::Discord => "discord",
            PlatformKind::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A linked account on an external chat platform
///
/// Created on first bot interaction, removed on explicit unlink.
/// Deactivated accounts stay linked but receive no notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAccount {
    pub platform: PlatformKind,
    /// Platform-specific external user ID (chat ID, snowflake, phone)
    pub external_id: String,
    pub username: Option<String>,
    pub is_active: bool,
    /// Unix nanos when the account was linked
    pub linked_at: i64,
}

impl PlatformAccount {
    /// Create a new active account link
    pub fn new(platform: PlatformKind, external_id: impl Into<String>, linked_at: i64) -> Self {
        Self {
            platform,
            external_id: external_id.into(),
            username: None,
            is_active: true,
            linked_at,
        }
    }

    /// The globally unique identity of this account
    pub fn identity(&self) -> (PlatformKind, &str) {
        (self.platform, &self.external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_kind_labels() {
        assert_eq!(PlatformKind::Telegram.as_str(), "telegram");
        assert_eq!(PlatformKind::Discord.as_str(), "discord");
        assert_eq!(PlatformKind::Whatsapp.as_str(), "whatsapp");
    }

    #[test]
    fn test_platform_kind_serialization() {
        let json = serde_json::to_string(&PlatformKind::Whatsapp).unwrap();
        assert_eq!(json, "\"whatsapp\"");

        let deserialized: PlatformKind = serde_json::from_str("\"telegram\"").unwrap();
        assert_eq!(deserialized, PlatformKind::Telegram);
    }

    #[test]
    fn test_account_identity() {
        let account = PlatformAccount::new(PlatformKind::Discord, "123456789", 1);
        assert_eq!(account.identity(), (PlatformKind::Discord, "123456789"));
        assert!(account.is_active);
        assert!(account.username.is_none());
    }
}
