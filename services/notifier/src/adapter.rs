//! Platform adapter interface
//!
//! One adapter per chat platform, behind a uniform capability-declaring
//! trait. The dispatcher never hardcodes platform message constraints;
//! it reads them from `capabilities()`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use types::errors::SendFailure;
use types::platform::PlatformKind;

/// Message constraints a platform declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Maximum message body length, in characters
    pub max_message_length: usize,
    /// Whether the platform renders `*bold*`-style markup
    pub supports_rich_formatting: bool,
}

/// External send capability of one chat platform
///
/// Implemented by out-of-scope platform plumbing (real SDK clients) and
/// by test doubles.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Which platform this adapter serves
    fn kind(&self) -> PlatformKind;

    /// Declared message constraints
    fn capabilities(&self) -> PlatformCapabilities;

    /// Send a formatted message to a platform-specific external ID
    async fn send(&self, external_id: &str, message: &str) -> Result<(), SendFailure>;
}

/// Registry of configured platform adapters
///
/// Platforms without a registered adapter are reported as failed
/// deliveries rather than panics.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<PlatformKind, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for its platform
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Look up the adapter for a platform
    pub fn get(&self, kind: PlatformKind) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    /// Platforms with a registered adapter
    pub fn kinds(&self) -> Vec<PlatformKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort();
        kinds
    }
}
