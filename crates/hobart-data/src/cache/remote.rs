//! Read-only remote cache tier.

use super::CacheTier;
use super::codec::decode_panel;
use crate::error::{DataError, Result};
use crate::panel::Panel;
use tracing::debug;

/// Object-key prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "research";

/// Shared object store holding serialized panels.
///
/// A missing object is `Ok(false)` / `Ok(None)`; any other failure is an error.
pub trait RemoteBackend: Send + Sync {
    /// Whether an object exists under `object_key`.
    fn exists(&self, object_key: &str) -> Result<bool>;

    /// Raw bytes of the object under `object_key`, if present.
    fn fetch(&self, object_key: &str) -> Result<Option<Vec<u8>>>;
}

/// Cache tier over a [`RemoteBackend`]. Reads only.
#[derive(Debug)]
pub struct RemoteTier<B> {
    backend: B,
    prefix: String,
}

impl<B: RemoteBackend> RemoteTier<B> {
    /// Create a tier using [`DEFAULT_PREFIX`].
    pub fn new(backend: B) -> Self {
        Self::with_prefix(backend, DEFAULT_PREFIX)
    }

    /// Create a tier whose objects live under `prefix`.
    pub fn with_prefix(backend: B, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// Object key for a cache key: `{prefix}/{key}.arrow`.
    pub fn object_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            format!("{key}.arrow")
        } else {
            format!("{}/{key}.arrow", self.prefix.trim_end_matches('/'))
        }
    }

    /// The underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: RemoteBackend> CacheTier for RemoteTier<B> {
    fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(&self.object_key(key))
    }

    fn fetch(&self, key: &str) -> Result<Option<Panel>> {
        let object_key = self.object_key(key);
        match self.backend.fetch(&object_key)? {
            Some(bytes) => {
                debug!(object_key = %object_key, bytes = bytes.len(), "remote cache hit");
                decode_panel(&bytes).map(Some)
            }
            None => Ok(None),
        }
    }

    fn store(&self, _key: &str, _panel: &Panel) -> Result<()> {
        Err(DataError::remote_write())
    }
}
