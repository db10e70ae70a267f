//! Flat on-disk cache of normalized icons.
//!
//! Records are keyed by platform and the *resolved* remote image name, never
//! by the query title. Nothing here evicts or expires a record.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

const CACHE_EXTENSION: &str = "png";
const PLACEHOLDER_PREFIX: &str = "placeholder";

/// Replaces everything outside `[A-Za-z0-9 -_+()]` with `_`, then turns
/// whitespace runs into a single `_`.
pub fn sanitize_component(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '-' | '_' | '+' | '(' | ')') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join("_")
}

fn ensure_dir(path: &Path) -> Option<()> {
    if !path.exists() {
        fs::create_dir_all(path).ok()?;
    }
    Some(())
}

fn write_atomic(bytes: &[u8], temp_path: &Path, target_path: &Path) -> Option<()> {
    if temp_path.exists() {
        let _ = fs::remove_file(temp_path);
    }
    if fs::write(temp_path, bytes).is_err() {
        let _ = fs::remove_file(temp_path);
        return None;
    }
    if fs::rename(temp_path, target_path).is_err() {
        let _ = fs::remove_file(temp_path);
        return None;
    }
    Some(())
}

#[derive(Debug, Clone)]
pub struct IconCache {
    root: PathBuf,
}

impl IconCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Uses `root` when it can be created, otherwise a directory under the OS temp dir.
    pub fn open_or_fallback(root: PathBuf) -> Self {
        if ensure_dir(&root).is_some() {
            return Self::new(root);
        }
        let fallback = std::env::temp_dir().join("romcover").join("icons");
        warn!(
            "Cache: cannot use {}, falling back to {}",
            root.display(),
            fallback.display()
        );
        let _ = ensure_dir(&fallback);
        Self::new(fallback)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, platform: &str, resolved_name: &str) -> PathBuf {
        self.root.join(format!(
            "{}__{}.{CACHE_EXTENSION}",
            sanitize_component(platform),
            sanitize_component(resolved_name)
        ))
    }

    pub fn placeholder_path(&self, platform: &str, title: &str) -> PathBuf {
        self.root.join(format!(
            "{PLACEHOLDER_PREFIX}__{}__{}.{CACHE_EXTENSION}",
            sanitize_component(platform),
            sanitize_component(title)
        ))
    }

    /// Returns the record path when a non-empty record exists.
    pub fn get(&self, platform: &str, resolved_name: &str) -> Option<PathBuf> {
        let path = self.record_path(platform, resolved_name);
        let metadata = fs::metadata(&path).ok()?;
        if !metadata.is_file() || metadata.len() == 0 {
            return None;
        }
        debug!("Cache: hit {}", path.display());
        Some(path)
    }

    /// Replaces the record for `(platform, resolved_name)` with `bytes` via temp file + rename.
    pub fn put(&self, platform: &str, resolved_name: &str, bytes: &[u8]) -> Option<PathBuf> {
        let target_path = self.record_path(platform, resolved_name);
        self.write_file(&target_path, bytes)
    }

    /// Writes a placeholder outside the record namespace so it never shadows a real match.
    pub fn put_placeholder(&self, platform: &str, title: &str, bytes: &[u8]) -> Option<PathBuf> {
        let target_path = self.placeholder_path(platform, title);
        self.write_file(&target_path, bytes)
    }

    fn write_file(&self, target_path: &Path, bytes: &[u8]) -> Option<PathBuf> {
        ensure_dir(&self.root)?;
        let temp_path = target_path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
        if write_atomic(bytes, &temp_path, target_path).is_none() {
            warn!("Cache: failed to write {}", target_path.display());
            return None;
        }
        Some(target_path.to_path_buf())
    }
}
