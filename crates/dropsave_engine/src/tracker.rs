use std::sync::Arc;

use dropsave_core::{
    settle, validate_submission, JobId, JobRecord, JobStatus, JobTable, StatusReport, TableView,
    ValidationError,
};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::client::JobClient;
use crate::credentials::CredentialProvider;
use crate::notice::{Notice, NoticeSink};
use crate::store::{JobStore, StoreError};
use crate::ClientError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not signed in")]
    NotAuthenticated,
    #[error("provider call failed: {0}")]
    Client(#[from] ClientError),
    #[error("job store failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted by the provider and stored under its id.
    Tracked(JobRecord),
    /// Refused by the provider; never stored.
    Rejected(JobRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshReport {
    /// Status checks issued this cycle.
    pub checked: usize,
    /// Jobs that reached a terminal status and were written.
    pub settled: usize,
    pub failed_checks: usize,
    /// Another cycle was still running, so this one did nothing.
    pub skipped: bool,
}

impl RefreshReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Turns user actions and timer ticks into job store mutations.
pub struct Tracker {
    client: Arc<dyn JobClient>,
    store: Arc<JobStore>,
    credentials: Arc<dyn CredentialProvider>,
    notices: Arc<dyn NoticeSink>,
    refresh_gate: Mutex<()>,
}

impl Tracker {
    pub fn new(
        client: Arc<dyn JobClient>,
        store: Arc<JobStore>,
        credentials: Arc<dyn CredentialProvider>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            client,
            store,
            credentials,
            notices,
            refresh_gate: Mutex::new(()),
        }
    }

    /// Current mapping, including jobs other processes added or removed.
    pub async fn jobs(&self) -> Result<JobTable, TrackerError> {
        Ok(self.with_store(|store| Ok(store.get())).await?)
    }

    pub async fn view(&self) -> Result<TableView, TrackerError> {
        Ok(TableView::from_table(&self.jobs().await?))
    }

    /// Validates, submits and, when the provider accepts, stores the new job.
    pub async fn on_submit(&self, path: &str, url: &str) -> Result<SubmitOutcome, TrackerError> {
        let submission = validate_submission(path, url)?;
        let credential = self
            .credentials
            .access_token()
            .ok_or(TrackerError::NotAuthenticated)?;

        engine_info!("Submitting path={} url={}", submission.path, submission.url);
        let record = match self
            .client
            .submit(&submission.path, &submission.url, &credential)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                engine_error!("Failed to save URL: {}", err);
                self.notices.emit(Notice::SubmitFailed);
                return Err(err.into());
            }
        };

        let job_id = match (&record.id, record.status) {
            (Some(id), Some(status)) if status != JobStatus::Failed => id.clone(),
            _ => {
                let error = record.error.clone().unwrap_or_default();
                engine_warn!("Provider rejected submission: {}", error);
                self.notices.emit(Notice::SubmitRejected { error });
                return Ok(SubmitOutcome::Rejected(record));
            }
        };

        let (key, value) = (job_id.clone(), record.clone());
        if let Err(err) = self.with_store(move |store| store.put(key, value)).await {
            engine_error!("Failed to store job {}: {}", job_id, err);
            self.notices.emit(Notice::SubmitFailed);
            return Err(err.into());
        }
        engine_info!("Tracking job {}", job_id);
        Ok(SubmitOutcome::Tracked(record))
    }

    /// One refresh cycle: check every pending job concurrently, then merge
    /// the terminal results in a single store update.
    pub async fn refresh_all(&self) -> Result<RefreshReport, TrackerError> {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            engine_debug!("Refresh already running; skipping");
            return Ok(RefreshReport::skipped());
        };
        let Some(credential) = self.credentials.access_token() else {
            engine_debug!("Not signed in; nothing to refresh");
            return Ok(RefreshReport::default());
        };

        let pending = self.with_store(|store| Ok(store.get())).await?.pending_ids();
        if pending.is_empty() {
            return Ok(RefreshReport::default());
        }

        let checked = pending.len();
        let results = join_all(pending.into_iter().map(|id| {
            let credential = credential.as_str();
            async move {
                let result = self.client.check_status(&id, credential).await;
                (id, result)
            }
        }))
        .await;

        let mut failed_checks = 0;
        let mut reports: Vec<(JobId, StatusReport)> = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(report) => {
                    if report.status.is_none() {
                        engine_debug!("Job {} reported an unknown status; leaving it", id);
                    }
                    reports.push((id, report));
                }
                Err(err) => {
                    failed_checks += 1;
                    engine_warn!("Status check for job {} failed: {}", id, err);
                }
            }
        }

        // Settled against the stored table as it is now, not as it was when
        // the checks started.
        let settled = self
            .with_store(move |store| {
                store.update(|jobs| {
                    let partial = settle(jobs, reports);
                    jobs.merge(partial)
                })
            })
            .await?;
        if settled > 0 {
            engine_info!("Refresh settled {} of {} job(s)", settled, checked);
        }

        Ok(RefreshReport {
            checked,
            settled,
            failed_checks,
            skipped: false,
        })
    }

    /// User-initiated removal. Returns whether an entry existed.
    pub async fn delete(&self, id: &str) -> Result<bool, TrackerError> {
        let key = id.to_string();
        let removed = self.with_store(move |store| store.delete(&key)).await?;
        if removed.is_some() {
            engine_info!("Deleted job {}", id);
        }
        Ok(removed.is_some())
    }

    /// Runs a store operation on the blocking pool; it does file IO under locks.
    async fn with_store<R, F>(&self, op: F) -> Result<R, StoreError>
    where
        F: FnOnce(&JobStore) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store)).await?
    }
}
