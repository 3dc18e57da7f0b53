//! Local-then-remote cache with pull-through.

use super::{CacheTier, PanelCache};
use crate::error::Result;
use crate::panel::Panel;
use tracing::debug;

/// Two-tier cache: a fast local tier plus an optional read-only remote tier.
pub struct TieredCache {
    local: Box<dyn CacheTier>,
    remote: Option<Box<dyn CacheTier>>,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("remote", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}

impl TieredCache {
    /// Create a cache over a local and a remote tier.
    pub fn new(local: impl CacheTier + 'static, remote: impl CacheTier + 'static) -> Self {
        Self {
            local: Box::new(local),
            remote: Some(Box::new(remote)),
        }
    }

    /// Create a local-only cache.
    pub fn without_remote(local: impl CacheTier + 'static) -> Self {
        Self {
            local: Box::new(local),
            remote: None,
        }
    }

    /// Whether a remote tier is configured.
    pub const fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

impl PanelCache for TieredCache {
    fn get(&self, key: &str) -> Result<Option<Panel>> {
        if let Some(panel) = self.local.fetch(key)? {
            debug!(key, "local cache hit");
            return Ok(Some(panel));
        }

        let Some(remote) = &self.remote else {
            return Ok(None);
        };
        if !remote.exists(key)? {
            debug!(key, "cache miss");
            return Ok(None);
        }

        let Some(panel) = remote.fetch(key)? else {
            return Ok(None);
        };
        // A failed local write fails the lookup.
        self.local.store(key, &panel)?;
        debug!(key, rows = panel.len(), "pulled remote entry into local cache");
        Ok(Some(panel))
    }

    fn put(&self, key: &str, panel: &Panel) -> Result<()> {
        self.local.store(key, panel)
    }
}
