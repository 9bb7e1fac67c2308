//! Presigned-URL provider speaking JSON to the signing service.

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use tracing::debug;

use cargohold_protocol::{
    MultipartAbortRequest, MultipartCompleteRequest, PresignedUrlRequest, PresignedUrlResponse,
};
use cargohold_transfer::{MultipartUrls, PartError, UrlProvider};

use crate::client::{classify_transport, status_error};

/// URL provider backed by an HTTP signing endpoint.
///
/// The endpoint receives [`PresignedUrlRequest`] documents and answers with
/// presigned URLs; `…/complete` and `…/abort` finalize or abandon multipart
/// uploads. Authentication against the endpoint is a bearer token; the
/// returned URLs carry their own authorization.
pub struct HttpUrlProvider {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpUrlProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn request(&self, suffix: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.post(format!("{}{suffix}", self.endpoint));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

impl UrlProvider for HttpUrlProvider {
    fn object_url(
        &self,
        object_key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, PartError>> + Send + '_>> {
        let request = self.request("").json(&PresignedUrlRequest {
            object_key: object_key.to_string(),
            number_of_parts: 0,
            part_digests: None,
            upload_id: None,
        });
        Box::pin(async move {
            let response: PresignedUrlResponse = send_json(request).await?;
            response
                .url
                .ok_or_else(|| PartError::fatal("provider returned no whole-object URL"))
        })
    }

    fn multipart_urls(
        &self,
        object_key: &str,
        part_count: u32,
        part_digests: Option<&[String]>,
        upload_id: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<MultipartUrls, PartError>> + Send + '_>> {
        let request = self.request("").json(&PresignedUrlRequest {
            object_key: object_key.to_string(),
            number_of_parts: part_count,
            part_digests: part_digests.map(|d| d.to_vec()),
            upload_id: upload_id.map(str::to_string),
        });
        Box::pin(async move {
            let response: PresignedUrlResponse = send_json(request).await?;
            debug!(
                object_key = %response.object_key,
                parts = response.part_urls.len(),
                "part URLs signed"
            );
            into_multipart_urls(response, part_count)
        })
    }

    fn complete_multipart(
        &self,
        object_key: &str,
        upload_id: &str,
        etags: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), PartError>> + Send + '_>> {
        let request = self.request("/complete").json(&MultipartCompleteRequest {
            object_key: object_key.to_string(),
            upload_id: upload_id.to_string(),
            etags: etags.to_vec(),
        });
        Box::pin(send_expecting_success(request))
    }

    fn abort_multipart(
        &self,
        object_key: &str,
        upload_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PartError>> + Send + '_>> {
        let request = self.request("/abort").json(&MultipartAbortRequest {
            object_key: object_key.to_string(),
            upload_id: upload_id.to_string(),
        });
        Box::pin(send_expecting_success(request))
    }
}

async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, PartError> {
    let response = request.send().await.map_err(classify_transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PartError::fatal(format!("malformed provider response: {e}")))
}

async fn send_expecting_success(request: reqwest::RequestBuilder) -> Result<(), PartError> {
    let response = request.send().await.map_err(classify_transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    Ok(())
}

/// Orders the signed part URLs by their 1-based wire part numbers and
/// converts them to the engine's 0-based indexing.
fn into_multipart_urls(
    response: PresignedUrlResponse,
    part_count: u32,
) -> Result<MultipartUrls, PartError> {
    let upload_id = response
        .upload_id
        .ok_or_else(|| PartError::fatal("provider returned no upload id"))?;
    if response.part_urls.len() != part_count as usize {
        return Err(PartError::fatal(format!(
            "provider returned {} part URLs, expected {}",
            response.part_urls.len(),
            part_count
        )));
    }

    let mut entries = response.part_urls;
    entries.sort_by_key(|p| p.part_number);
    for (i, entry) in entries.iter().enumerate() {
        if entry.part_number != i as u32 + 1 {
            return Err(PartError::fatal(format!(
                "provider part numbers are not contiguous: found {} at position {}",
                entry.part_number, i
            )));
        }
    }

    Ok(MultipartUrls {
        upload_id,
        part_urls: entries.into_iter().map(|p| p.url).collect(),
    })
}
