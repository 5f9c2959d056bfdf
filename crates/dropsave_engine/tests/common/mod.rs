#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use dropsave_core::{JobRecord, StatusReport};
use dropsave_engine::{
    ClientError, CredentialProvider, FailureKind, JobClient, JobStore, MemoryBackend, Notice,
    NoticeSink, StaticCredentials, Tracker,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

#[derive(Default)]
pub struct TestSink {
    notices: Mutex<Vec<Notice>>,
}

impl TestSink {
    pub fn take(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().drain(..).collect()
    }
}

impl NoticeSink for TestSink {
    fn emit(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// In-process provider stand-in with per-job scripted answers.
#[derive(Default)]
pub struct ScriptedClient {
    statuses: Mutex<HashMap<String, Result<StatusReport, ClientError>>>,
    submit_result: Mutex<Option<Result<JobRecord, ClientError>>>,
    pub submit_calls: AtomicUsize,
    pub check_calls: AtomicUsize,
    pub check_delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            check_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_status(&self, id: &str, report: StatusReport) {
        self.statuses
            .lock()
            .unwrap()
            .insert(id.to_string(), Ok(report));
    }

    pub fn fail_status(&self, id: &str) {
        self.statuses.lock().unwrap().insert(
            id.to_string(),
            Err(ClientError {
                kind: FailureKind::Network,
                message: "connection reset".to_string(),
            }),
        );
    }

    pub fn set_submit(&self, result: Result<JobRecord, ClientError>) {
        *self.submit_result.lock().unwrap() = Some(result);
    }

    pub fn checks(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JobClient for ScriptedClient {
    async fn submit(&self, path: &str, url: &str, _credential: &str) -> Result<JobRecord, ClientError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(JobRecord::added(path, url, "scripted", 1)))
    }

    async fn check_status(&self, job_id: &str, _credential: &str) -> Result<StatusReport, ClientError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.check_delay {
            tokio::time::sleep(delay).await;
        }
        self.statuses
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| Ok(StatusReport::default()))
    }
}

pub struct Harness {
    pub tracker: Arc<Tracker>,
    pub store: Arc<JobStore>,
    pub backend: Arc<MemoryBackend>,
    pub sink: Arc<TestSink>,
    pub credentials: Arc<StaticCredentials>,
}

pub fn harness(client: Arc<dyn JobClient>) -> Harness {
    harness_with_backend(client, Arc::new(MemoryBackend::new()))
}

pub fn harness_with_backend(client: Arc<dyn JobClient>, backend: Arc<MemoryBackend>) -> Harness {
    init_logging();
    let store = Arc::new(JobStore::open(backend.clone()));
    let sink = Arc::new(TestSink::default());
    let credentials = Arc::new(StaticCredentials::new(Some("test-token".to_string())));
    let tracker = Arc::new(Tracker::new(
        client,
        store.clone(),
        credentials.clone() as Arc<dyn CredentialProvider>,
        sink.clone(),
    ));
    Harness {
        tracker,
        store,
        backend,
        sink,
        credentials,
    }
}
