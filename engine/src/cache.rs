//! Local cache of bound collections.
//!
//! A cache keeps the last converged collection of a binding so the next
//! binding for the same view starts from it before the first GET returns.
//! Failures never propagate past [`LocalCache::load`] and
//! [`LocalCache::save`]: they are logged and the binding carries on.

use crate::error::{Error, Result};
use crate::Element;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Version of the cache file format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Storage key for a binding: element type name plus composed address.
///
/// The address includes query parameters, so differently filtered or sorted
/// views of one base address never share a cache entry.
pub fn storage_key(type_name: &str, address: &str) -> String {
    format!("{type_name}@{address}")
}

/// The on-disk form of one cached collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot<E> {
    pub format_version: u32,
    pub storage_key: String,
    pub elements: Vec<E>,
}

impl<E: Element> CacheSnapshot<E> {
    pub fn new(storage_key: impl Into<String>, elements: Vec<E>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            storage_key: storage_key.into(),
            elements,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

/// Persists collections by storage key.
pub trait LocalCache<E: Element>: Send + Sync + 'static {
    fn try_load(&self, storage_key: &str) -> Result<Vec<E>>;

    fn try_save(&self, storage_key: &str, elements: &[E]) -> Result<()>;

    /// Load, falling back to an empty collection on any failure.
    fn load(&self, storage_key: &str) -> Vec<E> {
        match self.try_load(storage_key) {
            Ok(elements) => elements,
            Err(e) => {
                warn!(storage_key, error = %e, "cache load failed, starting empty");
                Vec::new()
            }
        }
    }

    /// Save, logging and ignoring any failure.
    fn save(&self, storage_key: &str, elements: &[E]) {
        if let Err(e) = self.try_save(storage_key, elements) {
            warn!(storage_key, error = %e, "cache save failed");
        }
    }
}

/// One JSON file per storage key under a directory.
///
/// File names are the hex SHA-256 of the storage key, so arbitrary
/// addresses map to safe and distinct names.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A cache under the platform cache directory, e.g. `~/.cache/tether`.
    pub fn in_user_cache_dir() -> Result<Self> {
        let base = dirs::cache_dir()
            .ok_or_else(|| Error::Cache("no cache directory on this platform".into()))?;
        Ok(Self::new(base.join("tether")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file backing `storage_key`.
    pub fn path_for(&self, storage_key: &str) -> PathBuf {
        let digest = Sha256::digest(storage_key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl<E: Element> LocalCache<E> for FileCache {
    fn try_load(&self, storage_key: &str) -> Result<Vec<E>> {
        let path = self.path_for(storage_key);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(storage_key, "no cached collection");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot = CacheSnapshot::<E>::from_json(&json)?;
        if snapshot.storage_key != storage_key {
            return Err(Error::InvalidSnapshot(format!(
                "snapshot belongs to {}",
                snapshot.storage_key
            )));
        }
        debug!(storage_key, count = snapshot.elements.len(), "loaded cached collection");
        Ok(snapshot.elements)
    }

    fn try_save(&self, storage_key: &str, elements: &[E]) -> Result<()> {
        let json = CacheSnapshot::new(storage_key, elements.to_vec()).to_json()?;
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(storage_key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, &path)?;
        debug!(storage_key, count = elements.len(), "saved collection to cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: Option<u64>,
        name: String,
    }

    impl Element for Account {
        type Id = u64;

        fn id(&self) -> Option<u64> {
            self.id
        }
    }

    fn accounts() -> Vec<Account> {
        vec![
            Account {
                id: Some(1),
                name: "Tom".into(),
            },
            Account {
                id: None,
                name: "Max".into(),
            },
        ]
    }

    #[test]
    fn storage_keys_distinguish_views() {
        let plain = storage_key("Account", "https://example.com/accounts");
        let sorted = storage_key("Account", "https://example.com/accounts?sort_by=%2Bname");
        assert_ne!(plain, sorted);
        assert!(plain.starts_with("Account"));
    }

    #[test]
    fn snapshot_json_roundtrip() {
        let snapshot = CacheSnapshot::new("Account@accounts", accounts());
        let json = snapshot.to_json().unwrap();

        assert!(json.contains("\"formatVersion\":1"));
        assert!(json.contains("\"storageKey\":\"Account@accounts\""));
        assert_eq!(CacheSnapshot::<Account>::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn reject_future_format_version() {
        let json = r#"{"formatVersion": 999, "storageKey": "k", "elements": []}"#;
        let result = CacheSnapshot::<Account>::from_json(json);
        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn file_names_are_hashed_keys() {
        let cache = FileCache::new("/tmp/tether");
        let path = cache.path_for("Account@accounts?name%5Bexists%5D=Paul");
        let name = path.file_name().unwrap().to_str().unwrap();

        assert_eq!(name.len(), 64 + ".json".len());
        assert!(name.ends_with(".json"));
        assert_ne!(path, cache.path_for("Account@accounts"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested"));

        cache.save("Account@accounts", accounts().as_slice());
        let loaded: Vec<Account> = cache.load("Account@accounts");

        assert_eq!(loaded, accounts());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());

        let loaded: Vec<Account> = cache.try_load("Account@nowhere").unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        fs::write(cache.path_for("Account@accounts"), "{not json").unwrap();

        let result: Result<Vec<Account>> = cache.try_load("Account@accounts");
        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));

        let loaded: Vec<Account> = cache.load("Account@accounts");
        assert!(loaded.is_empty());
    }

    #[test]
    fn foreign_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let foreign = CacheSnapshot::new("Account@elsewhere", accounts());
        fs::write(cache.path_for("Account@accounts"), foreign.to_json().unwrap()).unwrap();

        let result: Result<Vec<Account>> = cache.try_load("Account@accounts");
        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
    }
}
