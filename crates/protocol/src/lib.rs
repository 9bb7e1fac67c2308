//! Wire types for talking to a presigned-URL provider.
//!
//! The transfer engine never signs requests itself. A provider service hands
//! out time-limited presigned URLs for whole objects and for individual
//! multipart-upload parts, and finalizes or aborts multipart uploads on the
//! engine's behalf. This crate defines the JSON payloads of that exchange
//! plus the storage profile document the provider and the engine share.

pub mod messages;
pub mod types;

pub use messages::{
    MultipartAbortRequest, MultipartCompleteRequest, PresignedPartUrl, PresignedUrlRequest,
    PresignedUrlResponse,
};
pub use types::StorageSettings;
