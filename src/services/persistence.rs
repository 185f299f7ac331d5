//! Shortlist persistence collaborators
//!
//! The store only needs a `load()`/`save()` pair. That pair is provided by
//! [`KeyValuePersistence`], which keeps a JSON array of unit IDs under a fixed
//! key in any [`KeyValueStorage`] backend.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

/// Fixed key the shortlist lives under
pub const STORAGE_KEY: &str = "presale.shortlist";

/// Persisted form of the shortlist: a bare JSON array of IDs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedShortlist {
    pub unit_ids: Vec<String>,
}

/// Load/save contract the shortlist store calls on init and after each mutation
pub trait ShortlistPersistence: Send + Sync + std::fmt::Debug {
    fn load(&self) -> Result<PersistedShortlist, CoreError>;
    fn save(&self, state: &PersistedShortlist) -> Result<(), CoreError>;
}

/// String key-value storage, the shape of browser-local storage
pub trait KeyValueStorage: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;
}

/// Adapts a key-value backend to the shortlist load/save contract
#[derive(Debug)]
pub struct KeyValuePersistence<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> KeyValuePersistence<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: KeyValueStorage> ShortlistPersistence for KeyValuePersistence<S> {
    fn load(&self) -> Result<PersistedShortlist, CoreError> {
        match self.storage.get(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => {
                debug!("No persisted shortlist under {}", self.key);
                Ok(PersistedShortlist::default())
            }
        }
    }

    fn save(&self, state: &PersistedShortlist) -> Result<(), CoreError> {
        let raw = serde_json::to_string(state)?;
        self.storage.set(&self.key, &raw)
    }
}

/// In-process key-value storage.
///
/// Can be marked unavailable to behave like disabled browser storage.
#[derive(Debug)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    available: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Storage that fails every call
    pub fn unavailable() -> Self {
        let storage = Self::new();
        storage.set_available(false);
        storage
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing availability
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn check(&self, operation: &'static str) -> Result<(), CoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::storage(operation, "storage is disabled"))
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.check("load")?;
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.check("save")?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key-value storage backed by one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::storage("load", format!("{}: {}", path.display(), e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));

        // Write-then-rename so a crash never leaves a truncated file behind
        fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(&tmp, value))
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|e| CoreError::storage("save", format!("{}: {}", path.display(), e)))?;

        debug!("Persisted {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}
