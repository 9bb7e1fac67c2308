//! Parallel multipart transfer engine for large build artifacts.
//!
//! The engine decides whether a file is worth splitting, transfers its parts
//! concurrently against presigned URLs, tracks progress and per-part
//! failures, and retries only the parts that failed, bounded by a restart
//! budget, without ever corrupting the assembled artifact.
//!
//! # Pipeline
//!
//! 1. **Plan**: [`Splitter`] judges splitability and cuts the file into
//!    contiguous parts
//! 2. **Dispatch**: [`TransferCoordinator`] fans pending parts out onto a
//!    bounded worker pool
//! 3. **Await**: part outcomes are folded into [`ResumeState`]
//! 4. **Restart**: failed parts are redispatched until done or the restart
//!    budget runs out
//!
//! Network access and URL signing stay behind the [`ObjectClient`] and
//! [`UrlProvider`] traits; the engine itself never builds an HTTP request.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fileio;
pub mod part;
pub mod planner;
pub mod progress;
pub mod resume;
pub mod types;

// Re-export primary types for convenience.
pub use client::{MultipartUrls, ObjectClient, PutPartResponse, UrlProvider};
pub use config::TransferSettings;
pub use coordinator::TransferCoordinator;
pub use error::{FailureKind, PartError, TransferError};
pub use fileio::{PartReader, PartWriter};
pub use planner::{Splitability, Splitter};
pub use progress::{ProgressCallback, ProgressTracker};
pub use resume::{PartStatus, ResumeState};
pub use types::{FilePart, PartFailure, PartOutcome, TransferPlan};
