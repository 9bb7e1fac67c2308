//! HTTP adapters for the transfer engine.
//!
//! [`S3HttpClient`] moves part bytes against presigned URLs;
//! [`HttpUrlProvider`] talks JSON to the service that signs them. One
//! parameterized client covers both S3 proper and S3-compatible stores:
//! the storage flavor is a value, not a subtype.

pub mod client;
pub mod urls;

pub use client::S3HttpClient;
pub use urls::HttpUrlProvider;
