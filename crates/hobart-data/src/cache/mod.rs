//! Tiered panel cache.
//!
//! Computed panels are stored under a string key. Reads try the local tier first, then
//! the read-only remote tier, copying remote hits into the local tier on the way back.
//! Writes only ever go to the local tier.

pub mod codec;
pub mod file;
pub mod memory;
pub mod remote;
pub mod sqlite;
pub mod tiered;

pub use codec::{decode_panel, encode_panel};
pub use file::FileTier;
pub use memory::MemoryTier;
pub use remote::{DEFAULT_PREFIX, RemoteBackend, RemoteTier};
pub use sqlite::SqliteBackend;
pub use tiered::TieredCache;

use crate::error::Result;
use crate::panel::Panel;

/// One storage tier holding serialized panels by key.
pub trait CacheTier: Send + Sync {
    /// Whether `key` is present.
    fn exists(&self, key: &str) -> Result<bool>;

    /// The panel stored under `key`, if any.
    fn fetch(&self, key: &str) -> Result<Option<Panel>>;

    /// Store `panel` under `key`, replacing any previous value.
    fn store(&self, key: &str, panel: &Panel) -> Result<()>;
}

/// Key-value cache for computed panels, as seen by the services.
pub trait PanelCache: Send + Sync {
    /// Look `key` up, returning `None` on a miss in every tier.
    fn get(&self, key: &str) -> Result<Option<Panel>>;

    /// Store `panel` under `key`.
    fn put(&self, key: &str, panel: &Panel) -> Result<()>;
}
