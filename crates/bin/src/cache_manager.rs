//! Cache location and assembly of the cache tiers.

use crate::error::CliError;
use hobart_data::{FileTier, MemoryTier, PanelCache, RemoteTier, SqliteBackend, TieredCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Local tier directory: `hobart` under the platform cache directory, or `./hobart` when there is none.
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hobart")
}

/// Cache options from the command line.
#[derive(Debug, Clone, Default)]
pub(crate) struct CacheOptions {
    pub(crate) cache_dir: Option<PathBuf>,
    pub(crate) remote_db: Option<PathBuf>,
    pub(crate) remote_prefix: String,
    pub(crate) disabled: bool,
}

impl CacheOptions {
    /// Directory of the local tier.
    pub(crate) fn local_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// Open the tiered cache.
///
/// With caching disabled results live in memory for the duration of the command. The
/// remote tier is opened read-only.
pub(crate) fn open_cache(options: &CacheOptions) -> Result<Arc<dyn PanelCache>, CliError> {
    if options.disabled {
        return Ok(Arc::new(TieredCache::without_remote(MemoryTier::new())));
    }

    let local = FileTier::new(options.local_dir());
    let cache = match &options.remote_db {
        Some(path) => TieredCache::new(local, open_remote(path, &options.remote_prefix)?),
        None => TieredCache::without_remote(local),
    };
    Ok(Arc::new(cache))
}

fn open_remote(path: &Path, prefix: &str) -> Result<RemoteTier<SqliteBackend>, CliError> {
    let backend = SqliteBackend::open(path)?;
    Ok(RemoteTier::with_prefix(backend, prefix))
}

/// Print the cache configuration and the cached keys.
pub(crate) fn print_cache_info(options: &CacheOptions) -> Result<(), CliError> {
    if options.disabled {
        println!("  Cache: Disabled");
        return Ok(());
    }

    let local = FileTier::new(options.local_dir());
    println!("  Cache location: {}", local.root().display());
    if let Some(remote) = &options.remote_db {
        println!("  Remote tier: {} (prefix {:?})", remote.display(), options.remote_prefix);
    }

    let keys = local.keys()?;
    if keys.is_empty() {
        println!("  Cached panels: none");
    } else {
        println!("  Cached panels:");
        for key in keys {
            println!("    {key}");
        }
    }
    Ok(())
}

/// Delete every locally cached panel, returning how many were removed.
pub(crate) fn clear_cache(options: &CacheOptions) -> Result<usize, CliError> {
    let local = FileTier::new(options.local_dir());
    let mut removed = 0;
    for key in local.keys()? {
        if local.remove(&key)? {
            removed += 1;
        }
    }
    Ok(removed)
}
