//! Types library for the EduOpportunity notification system
//!
//! This library provides all core type definitions shared between the
//! matching engine and the notification dispatcher, ensuring type safety
//! and deterministic behavior across services.
//!
//! # Modules
//! - `ids`: Unique identifiers (UserId, OpportunityId)
//! - `platform`: Chat platform kinds and linked platform accounts
//! - `profile`: User profiles and matching preferences
//! - `opportunity`: Opportunity lifecycle types
//! - `subscription`: Explicit (user, opportunity) interest records
//! - `notification`: Delivery records, outcomes, and the dedup key
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod platform;
pub mod profile;
pub mod opportunity;
pub mod subscription;
pub mod notification;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::platform::*;
    pub use crate::profile::*;
    pub use crate::opportunity::*;
    pub use crate::subscription::*;
    pub use crate::notification::*;
    pub use crate::errors::*;
}
