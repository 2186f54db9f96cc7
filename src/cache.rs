//! Durable set of transaction hashes that have already been notified.
//!
//! The on-disk form is a JSON array of strings. Every insertion rewrites the
//! whole file through a sibling temp file and a rename, so a crash during the
//! write leaves the previous contents intact.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::logging::LogContext;

#[derive(Debug)]
pub struct DedupCache {
    path: PathBuf,
    entries: BTreeSet<String>,
}

impl DedupCache {
    /// Load the cache at `path`. A missing file yields an empty cache; a file
    /// that does not hold a JSON array of strings is `CacheError::Corrupt`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                LogContext::new("cache", "load")
                    .with_metadata("path", serde_json::json!(path.display().to_string()))
                    .info("No cache file found, starting with an empty cache");
                return Ok(Self { path, entries: BTreeSet::new() });
            }
            Err(e) => return Err(CacheError::Io(e)),
        };

        let ids: Vec<String> = serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let entries: BTreeSet<String> = ids.iter().map(|id| normalize_id(id)).collect();

        LogContext::new("cache", "load")
            .with_metadata("path", serde_json::json!(path.display().to_string()))
            .with_metadata("entries", serde_json::json!(entries.len()))
            .info(&format!("Loaded {} notified transactions", entries.len()));

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(&normalize_id(id))
    }

    /// Insert `id` and persist immediately. Returns `false` when it was
    /// already present, in which case nothing is written.
    pub fn add(&mut self, id: &str) -> Result<bool, CacheError> {
        if !self.entries.insert(normalize_id(id)) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Write the current set to disk regardless of changes
    pub fn flush(&self) -> Result<(), CacheError> {
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let ids: Vec<&String> = self.entries.iter().collect();
        let body = serde_json::to_vec_pretty(&ids).map_err(|e| {
            CacheError::Io(std::io::Error::new(ErrorKind::InvalidData, e))
        })?;

        let tmp_path = temp_path_for(&self.path);
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        LogContext::new("cache", "persist")
            .with_metadata("entries", serde_json::json!(self.entries.len()))
            .debug("Cache persisted");
        Ok(())
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "cache".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let cache = DedupCache::load(dir.path().join("notified.json")).unwrap();
        assert!(cache.is_empty());
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_add_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notified.json");

        let mut cache = DedupCache::load(&path).unwrap();
        assert!(cache.add("0xABC").unwrap());
        assert!(!cache.add("0xabc").unwrap());

        let on_disk: Vec<String> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["0xabc".to_string()]);
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_entries_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notified.json");

        {
            let mut cache = DedupCache::load(&path).unwrap();
            cache.add("0x01").unwrap();
            cache.add("0x02").unwrap();
        }

        let reloaded = DedupCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("0x01"));
        assert!(reloaded.contains("0X02"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notified.json");

        fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        assert!(matches!(DedupCache::load(&path), Err(CacheError::Corrupt { .. })));

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(DedupCache::load(&path), Err(CacheError::Corrupt { .. })));

        fs::write(&path, "").unwrap();
        assert!(matches!(DedupCache::load(&path), Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_stale_temp_file_does_not_affect_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notified.json");

        fs::write(&path, "[\"0xaa\"]").unwrap();
        // Simulates a crash between writing the temp file and renaming it
        fs::write(temp_path_for(&path), "[\"0xaa\", \"0xb").unwrap();

        let cache = DedupCache::load(&path).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("0xaa"));
    }

    #[test]
    fn test_flush_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("notified.json");

        let cache = DedupCache::load(&path).unwrap();
        cache.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}
