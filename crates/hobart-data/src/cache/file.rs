//! Local filesystem cache tier.
//!
//! Layout: `{root}/{key}.arrow`, written through a uniquely named
//! temporary file in the same directory that is persisted over the target.

use super::CacheTier;
use super::codec::{decode_panel, encode_panel};
use crate::error::{DataError, Result};
use crate::panel::Panel;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Directory of Arrow IPC files, one per key.
#[derive(Debug, Clone)]
pub struct FileTier {
    root: PathBuf,
}

impl FileTier {
    /// Create a tier rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the tier.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.arrow", sanitize_key(key)))
    }

    /// Remove `key` if present. Returns whether a file was deleted.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("arrow") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl CacheTier for FileTier {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).is_file())
    }

    fn fetch(&self, key: &str) -> Result<Option<Panel>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        decode_panel(&bytes).map(Some)
    }

    fn store(&self, key: &str, panel: &Panel) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&encode_panel(panel)?)?;
        tmp.flush()?;

        // Concurrent writers of one key each own a distinct temp file; last persist wins.
        tmp.persist(&path).map(drop).map_err(|e| {
            DataError::Cache(format!("atomic rename failed for {}: {}", path.display(), e.error))
        })
    }
}

/// Map a key onto a safe file stem: anything outside `[A-Za-z0-9_.-]` becomes `_`.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
