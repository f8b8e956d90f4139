use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use parsync_core::{OperationKind, WorkItem};

use crate::executor::http::{HttpClient, HttpError, HttpRequestParts};
use crate::executor::operation::{OperationError, OperationExecutor};
use crate::retry::{parse_retry_after, RetryHeadersConfig};

const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Fatal,
}

/// Map a platform response status onto the engine's retry classification.
///
/// Timeouts, early data, throttling and server errors are transient; every other
/// non-2xx status is a permanent rejection of the operation.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        408 | 425 | 429 => StatusClass::Retryable,
        500..=599 => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}

/// Transport failures never reached the platform's validation, so all but malformed
/// requests are worth another attempt.
pub fn classify_transport_error(err: &HttpError) -> OperationError {
    match err {
        HttpError::InvalidRequest(msg) => OperationError::fatal(format!("invalid request: {msg}")),
        other => OperationError::retryable(other.to_string()),
    }
}

/// Executes catalog operations against a REST collection:
/// create → `POST {base}/{collection}`, update → `PUT {base}/{collection}/{id}`,
/// delete → `DELETE {base}/{collection}/{id}`.
pub struct HttpOperationExecutor {
    http: Arc<dyn HttpClient>,
    base_url: url::Url,
    collection: String,
    headers: BTreeMap<String, String>,
    retry_headers: RetryHeadersConfig,
}

impl HttpOperationExecutor {
    pub fn new(http: Arc<dyn HttpClient>, base_url: url::Url, collection: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            http,
            base_url,
            collection: collection.into(),
            headers,
            retry_headers: RetryHeadersConfig::commerce_platforms(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_retry_headers(mut self, cfg: RetryHeadersConfig) -> Self {
        self.retry_headers = cfg;
        self
    }

    pub fn build_request(&self, item: &WorkItem) -> Result<HttpRequestParts, OperationError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let collection = self.collection.trim_matches('/');
        let (method, raw_url) = match item.kind {
            OperationKind::Create => ("POST", format!("{base}/{collection}")),
            OperationKind::Update => (
                "PUT",
                format!("{base}/{collection}/{}", urlencoding::encode(&item.id)),
            ),
            OperationKind::Delete => (
                "DELETE",
                format!("{base}/{collection}/{}", urlencoding::encode(&item.id)),
            ),
        };
        let url = url::Url::parse(&raw_url)
            .map_err(|e| OperationError::fatal(format!("invalid target URL {raw_url}: {e}")))?;

        let body = match item.kind {
            OperationKind::Delete => Vec::new(),
            OperationKind::Create | OperationKind::Update => {
                if !item.payload.is_object() {
                    return Err(OperationError::fatal(format!(
                        "malformed payload for {} {}: expected a JSON object",
                        item.kind.as_str(),
                        item.id
                    )));
                }
                serde_json::to_vec(&item.payload)
                    .map_err(|e| OperationError::fatal(format!("payload not serializable: {e}")))?
            }
        };

        Ok(HttpRequestParts {
            method: method.to_string(),
            url,
            headers: self.headers.clone(),
            body,
        })
    }
}

#[async_trait]
impl OperationExecutor for HttpOperationExecutor {
    async fn execute(&self, item: &WorkItem) -> Result<(), OperationError> {
        let req = self.build_request(item)?;
        let resp = self
            .http
            .send(req)
            .await
            .map_err(|e| classify_transport_error(&e))?;

        match classify_status(resp.status) {
            StatusClass::Success => Ok(()),
            StatusClass::Retryable => Err(OperationError::Retryable {
                message: format!("platform returned {}", resp.status),
                retry_after: parse_retry_after(&resp.headers, &self.retry_headers, SystemTime::now()),
            }),
            StatusClass::Fatal => {
                let body: String = String::from_utf8_lossy(&resp.body)
                    .chars()
                    .take(MAX_ERROR_BODY_CHARS)
                    .collect();
                Err(OperationError::fatal(format!(
                    "platform rejected {} {} with {}: {}",
                    item.kind.as_str(),
                    item.id,
                    resp.status,
                    body.trim()
                )))
            }
        }
    }
}
