// Durable preference collaborator: a small key → bytes store.
//
// `JsonFilePreferenceStore` persists to `~/.folio/session.json` as a JSON
// object of base64 values. `MemoryPreferenceStore` is an isolated fake so
// tests never share process-wide state.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::security::write_private_atomic;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to read preferences from `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write preferences to `{}`: {message}", path.display())]
    Write { path: PathBuf, message: String },

    #[error("preference file `{}` is corrupt", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("preference `{key}` is not valid base64")]
    Encoding {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("preference store lock poisoned")]
    Poisoned,
}

/// Synchronous, process-wide key/value persistence.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PreferenceError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), PreferenceError>;
    fn remove(&self, key: &str) -> Result<(), PreferenceError>;
}

// ── In-memory ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PreferenceError> {
        let values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

// ── JSON file ──────────────────────────────────────────────────────

/// File-backed store. Every `set`/`remove` rewrites the file atomically, so
/// values survive a restart as soon as the call returns.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFilePreferenceStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or corrupt one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|source| PreferenceError::Corrupt { path: path.clone(), source })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(PreferenceError::Read { path, source }),
        };
        Ok(Self { path, values: Mutex::new(values) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), PreferenceError> {
        let contents = serde_json::to_vec_pretty(values).map_err(|source| {
            PreferenceError::Corrupt { path: self.path.clone(), source }
        })?;
        write_private_atomic(&self.path, &contents).map_err(|error| PreferenceError::Write {
            path: self.path.clone(),
            message: format!("{error:#}"),
        })
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PreferenceError> {
        let values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values
            .get(key)
            .map(|encoded| {
                STANDARD
                    .decode(encoded)
                    .map_err(|source| PreferenceError::Encoding { key: key.to_string(), source })
            })
            .transpose()
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        let previous = values.insert(key.to_string(), STANDARD.encode(value));
        if let Err(error) = self.persist(&values) {
            // Keep memory in step with disk.
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(error);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };
        if let Err(error) = self.persist(&values) {
            values.insert(key.to_string(), previous);
            return Err(error);
        }
        Ok(())
    }
}
