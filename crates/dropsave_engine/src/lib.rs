//! Dropsave engine: provider client, durable job store and the polling tracker.
mod backend;
mod client;
mod credentials;
mod notice;
mod persist;
mod poller;
mod store;
mod supervisor;
mod tracker;
mod types;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use client::{ClientSettings, DropboxClient, JobClient, DEFAULT_API_BASE};
pub use credentials::{CredentialProvider, StaticCredentials};
pub use notice::{Notice, NoticeSink};
pub use persist::{ensure_state_dir, PersistError, StateDir, StateLock};
pub use poller::{CycleSummary, Poller, DEFAULT_POLL_INTERVAL};
pub use store::{JobStore, StoreError, TASKS_KEY};
pub use supervisor::{session_channel, SessionHandle, Supervisor};
pub use tracker::{RefreshReport, SubmitOutcome, Tracker, TrackerError};
pub use types::{ClientError, FailureKind};
