use std::sync::{Arc, Mutex, PoisonError};

use dropsave_core::{JobRecord, JobTable};
use engine_logging::{engine_debug, engine_info, engine_warn};
use thiserror::Error;

use crate::backend::StorageBackend;
use crate::persist::PersistError;

/// Storage key holding the whole id -> record mapping.
pub const TASKS_KEY: &str = "tasks";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to serialize job table: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store task did not finish: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

/// Single source of truth for job records.
///
/// The backend, not this value, holds the table: other processes may write
/// the same state directory. Every mutation takes the backend's lock, re-reads
/// the latest table, applies the change and writes it back before the lock is
/// released. A failed write leaves storage unchanged.
///
/// All methods block on file IO; async callers run them on the blocking pool.
pub struct JobStore {
    backend: Arc<dyn StorageBackend>,
    last_seen: Mutex<JobTable>,
}

impl JobStore {
    /// Loads the persisted table. Missing or unreadable state starts empty.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        let jobs = read_table(backend.as_ref()).unwrap_or_else(|err| {
            engine_warn!("Failed to read persisted jobs: {}", err);
            JobTable::new()
        });
        engine_info!("Loaded {} persisted job(s)", jobs.len());
        Self {
            backend,
            last_seen: Mutex::new(jobs),
        }
    }

    /// Snapshot of the full mapping as currently stored. Falls back to the
    /// last table seen when storage cannot be read.
    pub fn get(&self) -> JobTable {
        let mut last_seen = self.lock();
        match read_table(self.backend.as_ref()) {
            Ok(jobs) => {
                *last_seen = jobs.clone();
                jobs
            }
            Err(err) => {
                engine_warn!("Failed to re-read persisted jobs: {}", err);
                last_seen.clone()
            }
        }
    }

    pub fn put(&self, id: impl Into<String>, record: JobRecord) -> Result<(), StoreError> {
        let id = id.into();
        self.update(move |jobs| {
            jobs.put(id, record);
        })
    }

    pub fn delete(&self, id: &str) -> Result<Option<JobRecord>, StoreError> {
        self.update(|jobs| jobs.delete(id))
    }

    /// Overwrites the keys present in `partial`. An empty partial writes nothing.
    pub fn merge(&self, partial: JobTable) -> Result<usize, StoreError> {
        if partial.is_empty() {
            return Ok(0);
        }
        self.update(move |jobs| jobs.merge(partial))
    }

    /// Applies `f` to the latest stored table and writes it back if it changed.
    pub fn update<R>(&self, f: impl FnOnce(&mut JobTable) -> R) -> Result<R, StoreError> {
        let mut last_seen = self.lock();
        let _entry = self.backend.lock(TASKS_KEY)?;

        let current = read_table(self.backend.as_ref())?;
        let mut next = current.clone();
        let result = f(&mut next);
        if next == current {
            *last_seen = current;
            return Ok(result);
        }

        let content = serde_json::to_string(&next)?;
        self.backend.write(TASKS_KEY, &content)?;
        engine_debug!("Persisted {} job(s)", next.len());
        *last_seen = next;
        Ok(result)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobTable> {
        self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads the stored table. An entry that does not decode is copied aside and
/// treated as empty, so the next write starts over without losing it.
fn read_table(backend: &dyn StorageBackend) -> Result<JobTable, StoreError> {
    let Some(content) = backend.read(TASKS_KEY)? else {
        return Ok(JobTable::new());
    };

    match serde_json::from_str::<JobTable>(&content) {
        Ok(jobs) => Ok(jobs),
        Err(err) => {
            engine_warn!("Failed to parse persisted jobs: {}", err);
            backend.preserve_corrupt(TASKS_KEY)?;
            Ok(JobTable::new())
        }
    }
}
