//! # Key/Value Persistence
//!
//! Counters and receiver configuration survive restarts through a small
//! namespaced key/value interface, modelled on the preferences store of
//! embedded targets.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: a `HashMap`, for tests and short lived processes
//! - [`FileStore`]: one JSON document per namespace in a directory
//!
//! ## Usage
//!
//! ```rust
//! use bresser_rs::storage::{KeyValueStore, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! store.put("BWS-CFG", "maxsensors", &[2]).unwrap();
//! assert_eq!(store.get("BWS-CFG", "maxsensors").unwrap(), Some(vec![2]));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Namespaced byte storage
pub trait KeyValueStore: Send + std::fmt::Debug {
    /// Read `key` from `namespace`; `None` if absent
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write `value` under `key` in `namespace`
    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete `key` from `namespace`. Removing an absent key is not an error.
    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;
}

/// Deserialize a JSON value stored under `key`
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    namespace: &str,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(namespace, key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON under `key`
pub fn save_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    namespace: &str,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(value)?;
    store.put(namespace, key, &bytes)
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<(String, String), Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries
            .insert((namespace.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.entries.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}

/// Directory backed store
///
/// Each namespace is a file `<dir>/<namespace>.json` holding an object that
/// maps keys to hex encoded values. Files are rewritten as a whole on every
/// `put`/`remove`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn namespace_path(&self, namespace: &str) -> Result<PathBuf, StorageError> {
        if namespace.is_empty()
            || !namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::Backend(format!("invalid namespace '{namespace}'")));
        }
        Ok(self.dir.join(format!("{namespace}.json")))
    }

    fn read_namespace(&self, namespace: &str) -> Result<BTreeMap<String, String>, StorageError> {
        let path = self.namespace_path(namespace)?;
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn write_namespace(&self, namespace: &str, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let path = self.namespace_path(namespace)?;
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.read_namespace(namespace)?;
        match entries.get(key) {
            Some(value) => hex::decode(value)
                .map(Some)
                .map_err(|e| StorageError::Backend(format!("corrupt value for {namespace}/{key}: {e}"))),
            None => Ok(None),
        }
    }

    fn put(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.read_namespace(namespace)?;
        entries.insert(key.to_string(), hex::encode(value));
        self.write_namespace(namespace, &entries)
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_namespace(namespace)?;
        if entries.remove(key).is_some() {
            self.write_namespace(namespace, &entries)?;
        }
        Ok(())
    }
}
