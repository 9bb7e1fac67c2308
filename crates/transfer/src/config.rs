//! Validated runtime settings.
//!
//! A [`StorageSettings`] document is whatever the configuring system
//! persisted; [`TransferSettings`] is the checked form the engine runs on.
//! Validation happens once, before any network activity, and bad values are
//! an error, never silently replaced by defaults.

use std::time::Duration;

use cargohold_protocol::StorageSettings;

use crate::error::TransferError;

/// Runtime limits for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    /// Part size for multipart transfers, in bytes.
    pub chunk_size: i64,
    /// Files smaller than this are transferred in a single request.
    pub min_multipart_size: i64,
    /// Upper bound on parts per object imposed by the store.
    pub part_count_cap: u32,
    /// Maximum parts in flight at once.
    pub max_concurrency: u32,
    /// Maximum redispatches of failed parts after the first attempt.
    pub max_restarts: u32,
    /// Network attempts per part within one dispatch.
    pub part_attempts: u32,
    /// Base delay between part attempts; doubles per attempt.
    pub retry_delay: Duration,
    /// Time budget for a single part attempt.
    pub part_timeout: Duration,
    /// Compute per-part SHA-256 digests and send them to the provider.
    pub check_consistency: bool,
}

impl TransferSettings {
    /// Validates a raw settings document into runtime settings.
    pub fn from_storage(settings: &StorageSettings) -> Result<Self, TransferError> {
        let validated = Self {
            chunk_size: settings.chunk_size_bytes,
            min_multipart_size: settings.min_multipart_size_bytes,
            part_count_cap: settings.part_count_cap,
            max_concurrency: settings.max_concurrency,
            max_restarts: settings.max_restarts,
            part_attempts: settings.part_attempts,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            part_timeout: Duration::from_secs(settings.part_timeout_secs),
            check_consistency: settings.check_consistency,
        };
        validated.validate()?;
        Ok(validated)
    }

    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size <= 0 {
            return Err(TransferError::Configuration(format!(
                "chunk size must be positive, got {}",
                self.chunk_size
            )));
        }
        if self.min_multipart_size <= 0 {
            return Err(TransferError::Configuration(format!(
                "minimum multipart size must be positive, got {}",
                self.min_multipart_size
            )));
        }
        if self.part_count_cap == 0 {
            return Err(TransferError::Configuration(
                "part count cap must be at least 1".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(TransferError::Configuration(
                "max concurrency must be at least 1".into(),
            ));
        }
        if self.part_attempts == 0 {
            return Err(TransferError::Configuration(
                "part attempts must be at least 1".into(),
            ));
        }
        if self.part_timeout.is_zero() {
            return Err(TransferError::Configuration(
                "part timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        // Mirrors the defaults of the persisted document.
        Self {
            chunk_size: 8 * 1024 * 1024,
            min_multipart_size: 32 * 1024 * 1024,
            part_count_cap: 10_000,
            max_concurrency: 4,
            max_restarts: 5,
            part_attempts: 5,
            retry_delay: Duration::from_millis(1_000),
            part_timeout: Duration::from_secs(300),
            check_consistency: false,
        }
    }
}
