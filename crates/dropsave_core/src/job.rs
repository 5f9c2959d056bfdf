use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque job identifier issued by the provider (`async_job_id`).
pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Added,
    InProgress,
    Complete,
    Failed,
}

impl JobStatus {
    const ALL: [JobStatus; 4] = [
        JobStatus::Added,
        JobStatus::InProgress,
        JobStatus::Complete,
        JobStatus::Failed,
    ];

    /// Wire tag used by the provider and in persisted state.
    pub fn as_tag(self) -> &'static str {
        match self {
            JobStatus::Added => "added",
            JobStatus::InProgress => "in_progress",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    /// Maps a provider `.tag` to a status; unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_tag() == tag)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, JobStatus::Added | JobStatus::InProgress)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One submitted save-url task.
///
/// Optional fields are omitted from the serialized form rather than written
/// as `null`, which keeps persisted state readable by older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub path: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl JobRecord {
    /// A record accepted by the provider under `id`.
    pub fn added(
        path: impl Into<String>,
        url: impl Into<String>,
        id: impl Into<JobId>,
        timestamp: i64,
    ) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            id: Some(id.into()),
            status: Some(JobStatus::Added),
            error: None,
            timestamp: Some(timestamp),
        }
    }

    /// A record the provider refused; it never carries an id.
    pub fn failed(path: impl Into<String>, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
            id: None,
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            timestamp: None,
        }
    }

    /// True when the record has an id and a non-terminal status.
    pub fn is_pending(&self) -> bool {
        self.id.is_some() && self.status.is_some_and(JobStatus::is_pending)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JobStatus::is_terminal)
    }
}

/// Normalized answer to one status check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusReport {
    /// `None` when the provider answered with a tag this client does not know.
    pub status: Option<JobStatus>,
    pub error: Option<String>,
}

impl StatusReport {
    pub fn new(status: Option<JobStatus>, error: Option<String>) -> Self {
        Self { status, error }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JobStatus::is_terminal)
    }
}
