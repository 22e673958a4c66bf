//! Notification Dispatcher Service
//!
//! Delivers a single logical notification to every platform account a
//! user has linked, tolerating partial delivery failure per platform
//! and never recording a successful delivery twice for the same
//! (user, opportunity, platform) triple.
//!
//! **Key Invariants:**
//! - At most one `Sent` record per dedup key, even under concurrent
//!   `notify` calls (conditional insert, losers downgrade to `Skipped`)
//! - Per-platform sends are independent: one failure never blocks or
//!   rolls back the others
//! - In-flight sends run to completion and write their records even if
//!   the calling future is cancelled

pub mod adapter;
pub mod config;
pub mod dispatcher;
pub mod format;
pub mod session;
pub mod store;
pub mod sweep;

pub use adapter::{AdapterRegistry, PlatformAdapter, PlatformCapabilities};
pub use config::{DispatcherConfig, SweepConfig};
pub use dispatcher::Dispatcher;
pub use sweep::{SweepSummary, Sweeper};
