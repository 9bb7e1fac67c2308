//! Capability traits the engine consumes.
//!
//! The engine never signs or builds HTTP requests itself. An [`UrlProvider`]
//! hands out presigned URLs and drives the multipart lifecycle; an
//! [`ObjectClient`] moves bytes against a URL it is given. Using traits
//! keeps the engine decoupled from the HTTP stack and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use crate::error::PartError;

/// Store receipt for one uploaded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutPartResponse {
    /// ETag the store assigned to the part, when it returned one.
    pub etag: Option<String>,
}

/// Presigned URLs for one multipart upload, in part order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUrls {
    pub upload_id: String,
    /// `part_urls[i]` belongs to the part with index `i`.
    pub part_urls: Vec<String>,
}

/// Issues single ranged/whole requests against a presigned URL.
///
/// Implementations classify their failures as retryable or fatal via
/// [`PartError::kind`](crate::error::PartError); the engine's retry layers
/// branch on that tag.
pub trait ObjectClient: Send + Sync {
    /// Uploads one part (or a whole object) with a PUT to `url`.
    fn put_part(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<PutPartResponse, PartError>> + Send + '_>>;

    /// Downloads the byte range `[offset, offset + length)` from `url`.
    fn get_range(
        &self,
        url: &str,
        offset: i64,
        length: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, PartError>> + Send + '_>>;
}

/// Supplies presigned URLs and the multipart lifecycle operations.
///
/// Credentials, sessions and signing live entirely behind this trait.
pub trait UrlProvider: Send + Sync {
    /// Presigned URL for a whole-object GET or PUT.
    fn object_url(
        &self,
        object_key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, PartError>> + Send + '_>>;

    /// Presigned URLs for every part of a multipart upload.
    ///
    /// Passing the `upload_id` of an earlier call re-signs the same upload
    /// instead of opening a new one; restarted dispatches need this because
    /// presigned URLs expire.
    fn multipart_urls(
        &self,
        object_key: &str,
        part_count: u32,
        part_digests: Option<&[String]>,
        upload_id: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<MultipartUrls, PartError>> + Send + '_>>;

    /// Finalizes a multipart upload from its part ETags, in part order.
    fn complete_multipart(
        &self,
        object_key: &str,
        upload_id: &str,
        etags: &[String],
    ) -> Pin<Box<dyn Future<Output = Result<(), PartError>> + Send + '_>>;

    /// Abandons a multipart upload, releasing any stored parts.
    fn abort_multipart(
        &self,
        object_key: &str,
        upload_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PartError>> + Send + '_>>;
}
