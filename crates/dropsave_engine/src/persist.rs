use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_warn;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the state directory exists; create if missing.
pub fn ensure_state_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StateDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    }
    Ok(())
}

/// Directory of persisted entries, one `<key>.json` file per key.
///
/// Each entry has a sibling `<key>.lock` used for advisory locking between
/// dropsave processes sharing the directory, and a `<key>.json.corrupt`
/// copy kept when an entry could not be decoded.
#[derive(Debug, Clone)]
pub struct StateDir {
    dir: PathBuf,
}

impl StateDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn corrupt_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json.corrupt"))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.lock"))
    }

    pub fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replaces the entry through a synced temp file and a rename, so readers
    /// see either the old content or the new, never a partial file.
    pub fn write(&self, key: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_state_dir(&self.dir)?;

        let target = self.entry_path(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Blocks until this process holds the entry's lock file exclusively.
    pub fn lock(&self, key: &str) -> Result<StateLock, PersistError> {
        ensure_state_dir(&self.dir)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path(key))?;
        lock_exclusive(&file)?;
        Ok(StateLock { file: Some(file) })
    }

    /// Copies an undecodable entry aside before it gets overwritten.
    pub fn preserve_corrupt(&self, key: &str) -> Result<Option<PathBuf>, PersistError> {
        let source = self.entry_path(key);
        if !source.exists() {
            return Ok(None);
        }
        let target = self.corrupt_path(key);
        fs::copy(&source, &target)?;
        engine_warn!("Kept unreadable {:?} as {:?}", source, target);
        Ok(Some(target))
    }
}

/// Held while a read-modify-write of one entry is in progress.
#[derive(Debug)]
pub struct StateLock {
    file: Option<File>,
}

impl StateLock {
    /// A guard that excludes nothing, for backends living in one process.
    pub fn process_local() -> Self {
        Self { file: None }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            unlock(file);
        }
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;

    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

// Without flock the lock file only serializes writers inside this process.
#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}
