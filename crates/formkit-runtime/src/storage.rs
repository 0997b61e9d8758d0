//! Durable client-side storage
//!
//! A string key/value store scoped to one respondent:
//!
//! - `form_{formId}` holds the current submission id for a form
//! - `form_{formId}_{submissionId}` holds the JSON-encoded cached answers
//!
//! `MemoryStore` backs tests and one-shot processes; `FileStore` persists a
//! single JSON object to disk, written through a temporary file and rename.

use crate::error::StorageError;
use dashmap::DashMap;
use formkit_core::Answers;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Key holding the submission id for a form
#[inline]
#[must_use]
pub fn submission_key(form_id: &str) -> String {
    format!("form_{form_id}")
}

/// Key holding cached answers of one submission
#[inline]
#[must_use]
pub fn answers_key(form_id: &str, submission_id: &str) -> String {
    format!("form_{form_id}_{submission_id}")
}

/// Respondent-local key/value storage
pub trait ClientStore: Send + Sync + Debug {
    /// Read a value
    ///
    /// # Errors
    /// - `StorageError` if the backing medium cannot be read
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    /// - `StorageError` if the value cannot be persisted
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value; missing keys are not an error
    ///
    /// # Errors
    /// - `StorageError` if the deletion cannot be persisted
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read cached answers for a submission
///
/// Unparsable cache entries are treated as absent.
///
/// # Errors
/// - `StorageError` if the store cannot be read
pub fn load_cached_answers(
    store: &dyn ClientStore,
    form_id: &str,
    submission_id: &str,
) -> Result<Option<Answers>, StorageError> {
    let Some(raw) = store.get(&answers_key(form_id, submission_id))? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(answers) => Ok(Some(answers)),
        Err(e) => {
            tracing::warn!(form_id, submission_id, error = %e, "ignoring unreadable answer cache");
            Ok(None)
        }
    }
}

/// Write cached answers for a submission
///
/// # Errors
/// - `StorageError` if the answers cannot be encoded or persisted
pub fn store_cached_answers(
    store: &dyn ClientStore,
    form_id: &str,
    submission_id: &str,
    answers: &Answers,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(answers).map_err(|e| StorageError::Encode(e.to_string()))?;
    store.set(&answers_key(form_id, submission_id), &raw)
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key is present
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl ClientStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk
///
/// The whole map is kept in memory and rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open a store file, starting empty if it does not exist
    ///
    /// # Errors
    /// - `StorageError::Io` if the file exists but cannot be read
    /// - `StorageError::Corrupt` if it is not a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened client store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text =
            serde_json::to_string_pretty(entries).map_err(|e| StorageError::Encode(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, text).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl ClientStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}
