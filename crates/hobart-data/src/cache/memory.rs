//! In-process cache tier.

use super::CacheTier;
use crate::error::{DataError, Result};
use crate::panel::Panel;
use std::collections::HashMap;
use std::sync::RwLock;

/// Panels held in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryTier {
    panels: RwLock<HashMap<String, Panel>>,
}

impl MemoryTier {
    /// Create an empty tier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.panels.read().map(|p| p.len()).unwrap_or_default()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> DataError {
    DataError::Cache("memory tier lock poisoned".to_string())
}

impl CacheTier for MemoryTier {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.panels.read().map_err(|_| poisoned())?.contains_key(key))
    }

    fn fetch(&self, key: &str) -> Result<Option<Panel>> {
        Ok(self.panels.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn store(&self, key: &str, panel: &Panel) -> Result<()> {
        self.panels
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), panel.clone());
        Ok(())
    }
}
