//! Error taxonomy for the transfer engine.
//!
//! Part-level failures carry a [`FailureKind`] tag instead of relying on
//! error downcasting: the part unit and the coordinator branch on the tag,
//! never on stack unwinding.

use crate::types::PartFailure;

/// Whether a failure is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient: timeouts, connection resets, 5xx, rate limiting.
    Retryable,
    /// Permanent: authorization, missing object, malformed range, disk full.
    Fatal,
}

/// Failure of a single part attempt or provider call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct PartError {
    pub kind: FailureKind,
    pub message: String,
}

impl PartError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Retryable,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Fatal,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == FailureKind::Fatal
    }

    /// Classifies a local file I/O failure.
    ///
    /// Disk errors do not heal by retrying, with the exception of
    /// interrupted and timed-out operations.
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::Interrupted | ErrorKind::TimedOut => {
                Self::retryable(format!("I/O error: {err}"))
            }
            _ => Self::fatal(format!("I/O error: {err}")),
        }
    }
}

/// Terminal result of a whole transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Invalid settings, reported before any network activity.
    #[error("invalid transfer settings: {0}")]
    Configuration(String),

    /// A part or provider call failed permanently; the transfer aborted.
    #[error("transfer of {object_key} aborted: {message}")]
    Fatal {
        object_key: String,
        /// Part that triggered the abort, when one did.
        part_index: Option<u32>,
        bytes_transferred: i64,
        restart_count: u32,
        message: String,
    },

    /// The restart budget ran out with parts still failing.
    #[error(
        "transfer of {object_key} incomplete after {restart_count} restarts: \
         {} part(s) still failing", failed_parts.len()
    )]
    PartialFailure {
        object_key: String,
        failed_parts: Vec<PartFailure>,
        bytes_transferred: i64,
        restart_count: u32,
    },

    /// The caller cancelled; partial artifacts must be treated as unusable.
    #[error("transfer of {object_key} cancelled")]
    Cancelled {
        object_key: String,
        bytes_transferred: i64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
