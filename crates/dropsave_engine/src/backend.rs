use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::persist::{PersistError, StateDir, StateLock};

/// Durable key/value storage behind the job store.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError>;
    /// Must not return before the value is durable.
    fn write(&self, key: &str, value: &str) -> Result<(), PersistError>;
    /// Excludes every other writer of `key` until the guard is dropped.
    fn lock(&self, key: &str) -> Result<StateLock, PersistError>;
    /// Keeps a copy of the current value of `key`, which failed to decode.
    fn preserve_corrupt(&self, key: &str) -> Result<(), PersistError>;
}

/// One JSON file per key inside a state directory, shared safely between
/// processes.
#[derive(Debug, Clone)]
pub struct FileBackend {
    state: StateDir,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            state: StateDir::new(dir),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.state.entry_path(key)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        self.state.read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.state.write(key, value).map(|_| ())
    }

    fn lock(&self, key: &str) -> Result<StateLock, PersistError> {
        self.state.lock(key)
    }

    fn preserve_corrupt(&self, key: &str) -> Result<(), PersistError> {
        self.state.preserve_corrupt(key).map(|_| ())
    }
}

/// Process-local backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let backend = Self::new();
        backend.entries().insert(key.to_string(), value.to_string());
        backend
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy kept by `preserve_corrupt`, if any.
    pub fn corrupt_copy(&self, key: &str) -> Option<String> {
        self.entries().get(&corrupt_key(key)).cloned()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries().insert(key.to_string(), value.to_string());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn lock(&self, _key: &str) -> Result<StateLock, PersistError> {
        Ok(StateLock::process_local())
    }

    fn preserve_corrupt(&self, key: &str) -> Result<(), PersistError> {
        let mut entries = self.entries();
        if let Some(value) = entries.get(key).cloned() {
            entries.insert(corrupt_key(key), value);
        }
        Ok(())
    }
}

fn corrupt_key(key: &str) -> String {
    format!("{key}.corrupt")
}
