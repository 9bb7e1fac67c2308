//! Object client speaking plain ranged GET / part PUT against presigned URLs.

use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use reqwest::header::{ETAG, RANGE};
use tracing::debug;

use cargohold_transfer::{FailureKind, ObjectClient, PartError, PutPartResponse};

/// HTTP client for S3 and S3-compatible object stores.
///
/// All authorization lives in the presigned URLs it is handed; the client
/// itself carries no credentials. The storage flavor is data, used only for
/// diagnostics.
pub struct S3HttpClient {
    http: reqwest::Client,
    storage_type_id: String,
}

impl S3HttpClient {
    pub fn new(storage_type_id: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), storage_type_id)
    }

    /// Wraps an externally configured `reqwest` client (proxies, TLS, pools).
    pub fn with_client(http: reqwest::Client, storage_type_id: impl Into<String>) -> Self {
        Self {
            http,
            storage_type_id: storage_type_id.into(),
        }
    }

    pub fn storage_type_id(&self) -> &str {
        &self.storage_type_id
    }
}

impl ObjectClient for S3HttpClient {
    fn put_part(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<PutPartResponse, PartError>> + Send + '_>> {
        let request = self.http.put(url).body(body);
        Box::pin(async move {
            let response = request.send().await.map_err(classify_transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(status_error(status));
            }
            let etag = response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(normalize_etag);
            debug!(
                storage = %self.storage_type_id,
                status = status.as_u16(),
                "part uploaded"
            );
            Ok(PutPartResponse { etag })
        })
    }

    fn get_range(
        &self,
        url: &str,
        offset: i64,
        length: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, PartError>> + Send + '_>> {
        let request = self
            .http
            .get(url)
            .header(RANGE, range_header(offset, length));
        Box::pin(async move {
            let response = request.send().await.map_err(classify_transport)?;
            let status = response.status();
            // 206 is the ranged answer; a store ignoring the Range header
            // answers 200 with the whole object, which the caller catches
            // by verifying the returned length.
            if status != StatusCode::PARTIAL_CONTENT && status != StatusCode::OK {
                return Err(status_error(status));
            }
            let bytes = response.bytes().await.map_err(classify_transport)?;
            debug!(
                storage = %self.storage_type_id,
                status = status.as_u16(),
                bytes = bytes.len(),
                "range received"
            );
            Ok(bytes.to_vec())
        })
    }
}

/// `Range` header value for `[offset, offset + length)`.
pub(crate) fn range_header(offset: i64, length: i64) -> String {
    format!("bytes={}-{}", offset, offset + length - 1)
}

/// Stores quote ETags; some proxies also prefix them with `W/`.
fn normalize_etag(raw: &str) -> String {
    raw.trim_start_matches("W/").trim_matches('"').to_string()
}

pub(crate) fn classify_status(status: StatusCode) -> FailureKind {
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        FailureKind::Retryable
    } else {
        FailureKind::Fatal
    }
}

pub(crate) fn status_error(status: StatusCode) -> PartError {
    PartError {
        kind: classify_status(status),
        message: format!("unexpected status {status}"),
    }
}

pub(crate) fn classify_transport(err: reqwest::Error) -> PartError {
    if err.is_builder() {
        PartError::fatal(format!("request error: {err}"))
    } else {
        // Timeouts, resets, broken connections: worth another attempt.
        PartError::retryable(format!("transport error: {err}"))
    }
}
