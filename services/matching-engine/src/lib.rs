//! Matching Engine Service
//!
//! Scores and ranks approved opportunities for a user profile based on
//! interest tags, education level, field of study, location, and
//! posting recency.
//!
//! **Key Invariants:**
//! - Pure function of (profile, pool, now): no side effects, safe to
//!   call concurrently with no locking
//! - Deterministic ranking (same inputs → same outputs)
//! - Past-deadline opportunities never appear in output
//! - Sparse profiles degrade to fewer scoring signals, never to errors

pub mod config;
pub mod scoring;
pub mod engine;

pub use config::MatchWeights;
pub use engine::{rank, RankedOpportunity};
