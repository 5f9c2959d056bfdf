use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dropsave_core::{JobRecord, JobStatus, StatusReport};
use engine_logging::{engine_debug, redact_credentials, CREDENTIAL_PARAM};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{ClientError, FailureKind};

pub const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com/2/files";

const SAVE_URL_ROUTE: &str = "save_url";
const CHECK_STATUS_ROUTE: &str = "save_url/check_job_status";
// Lets the provider accept a JSON body without a CORS preflight.
const BODY_CONTENT_TYPE: &str = "text/plain; charset=dropbox-cors-hack";

#[derive(Clone)]
pub struct ClientSettings {
    pub api_base: String,
    pub connect_timeout: Duration,
    /// `None` leaves requests unbounded; a hung call stalls only its own job.
    pub request_timeout: Option<Duration>,
    /// Wall clock in milliseconds since the Unix epoch, stamped on new records.
    pub now_millis: Arc<dyn Fn() -> i64 + Send + Sync>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            now_millis: Arc::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }
}

impl ClientSettings {
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_base", &self.api_base)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// The two remote operations the tracker needs.
#[async_trait::async_trait]
pub trait JobClient: Send + Sync {
    /// Asks the provider to save `url` at `path`.
    ///
    /// A refusal (non-200 or a provider error tag) is returned as an
    /// `Ok` record with `status = Failed`; only transport and decoding
    /// problems are errors.
    async fn submit(&self, path: &str, url: &str, credential: &str) -> Result<JobRecord, ClientError>;

    async fn check_status(&self, job_id: &str, credential: &str) -> Result<StatusReport, ClientError>;
}

#[derive(Debug, Serialize)]
struct SaveUrlArg<'a> {
    path: &'a str,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct SaveUrlResult {
    #[serde(default)]
    async_job_id: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Serialize)]
struct CheckStatusArg<'a> {
    async_job_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckStatusResult {
    #[serde(rename = ".tag", default)]
    tag: Option<String>,
    #[serde(default)]
    failed: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct DropboxClient {
    settings: ClientSettings,
    http: reqwest::Client,
}

impl DropboxClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ClientError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, http })
    }

    fn endpoint(&self, route: &str, credential: &str) -> Result<Url, ClientError> {
        let base = self.settings.api_base.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{route}"))
            .map_err(|err| ClientError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut()
            .append_pair(CREDENTIAL_PARAM, &format!("Bearer {credential}"));
        Ok(url)
    }

    async fn post(&self, url: Url, body: String) -> Result<(StatusCode, String), ClientError> {
        engine_debug!("POST {}", redact_credentials(url.as_str()));
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, BODY_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        Ok((status, text))
    }
}

#[async_trait::async_trait]
impl JobClient for DropboxClient {
    async fn submit(&self, path: &str, url: &str, credential: &str) -> Result<JobRecord, ClientError> {
        let endpoint = self.endpoint(SAVE_URL_ROUTE, credential)?;
        let body = encode(&SaveUrlArg { path, url })?;
        let (status, text) = self.post(endpoint, body).await?;

        if status != StatusCode::OK {
            return Ok(JobRecord::failed(path, url, text));
        }

        let result: SaveUrlResult = decode(&text)?;
        if let Some(error) = result.error {
            return Ok(JobRecord::failed(path, url, tag_of(&error)));
        }
        let job_id = result.async_job_id.ok_or_else(|| {
            ClientError::new(FailureKind::Decode, "response carries no async_job_id")
        })?;
        Ok(JobRecord::added(path, url, job_id, (self.settings.now_millis)()))
    }

    async fn check_status(&self, job_id: &str, credential: &str) -> Result<StatusReport, ClientError> {
        let endpoint = self.endpoint(CHECK_STATUS_ROUTE, credential)?;
        let body = encode(&CheckStatusArg {
            async_job_id: job_id,
        })?;
        let (status, text) = self.post(endpoint, body).await?;

        if !status.is_success() {
            return Err(ClientError::new(FailureKind::HttpStatus(status.as_u16()), text));
        }

        let result: CheckStatusResult = decode(&text)?;
        Ok(StatusReport::new(
            result.tag.as_deref().and_then(JobStatus::from_tag),
            result.failed.as_ref().map(tag_of),
        ))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value).map_err(|err| ClientError::new(FailureKind::Decode, err.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(text: &'a str) -> Result<T, ClientError> {
    serde_json::from_str(text).map_err(|err| ClientError::new(FailureKind::Decode, err.to_string()))
}

/// Extracts `.tag` from a tagged union value; anything else is rendered as JSON.
fn tag_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other
            .get(".tag")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), ToOwned::to_owned),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    // The request URL carries the credential; keep it out of messages.
    let err = err.without_url();
    if err.is_timeout() {
        return ClientError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ClientError::new(FailureKind::Decode, err.to_string());
    }
    ClientError::new(FailureKind::Network, err.to_string())
}
