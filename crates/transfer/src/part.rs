//! Transfer of a single part, with local bounded retry.
//!
//! Retries here are invisible to the coordinator: a part either comes back
//! successful or with the error of its last attempt. Only retryable
//! failures consume further attempts; fatal ones surface immediately.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::ObjectClient;
use crate::config::TransferSettings;
use crate::error::PartError;
use crate::fileio::{PartReader, PartWriter};
use crate::progress::ProgressTracker;
use crate::types::{FilePart, PartOutcome};

/// Executes one part's network operation.
pub struct PartTransfer<'a> {
    client: &'a dyn ObjectClient,
    settings: &'a TransferSettings,
    progress: &'a ProgressTracker,
    cancel: &'a CancellationToken,
}

impl<'a> PartTransfer<'a> {
    pub fn new(
        client: &'a dyn ObjectClient,
        settings: &'a TransferSettings,
        progress: &'a ProgressTracker,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            settings,
            progress,
            cancel,
        }
    }

    /// Uploads `part`, rereading it from `reader` on every attempt.
    ///
    /// Progress is credited only once the whole part is confirmed.
    pub async fn upload(&self, reader: &PartReader, part: &FilePart, url: &str) -> PartOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.upload_attempt(reader, part, url).await {
                Ok(etag) => {
                    self.progress.add(part.length);
                    return PartOutcome::succeeded(part, attempts, etag);
                }
                Err(error) => {
                    if self.gives_up(&error, attempts) {
                        return PartOutcome::failed(part, attempts, error);
                    }
                    self.backoff(part, attempts, &error).await;
                }
            }
        }
    }

    /// Downloads `part` and writes it at its own offset.
    pub async fn download(&self, writer: &PartWriter, part: &FilePart, url: &str) -> PartOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.download_attempt(writer, part, url).await {
                Ok(()) => {
                    self.progress.add(part.length);
                    return PartOutcome::succeeded(part, attempts, None);
                }
                Err(error) => {
                    if self.gives_up(&error, attempts) {
                        return PartOutcome::failed(part, attempts, error);
                    }
                    self.backoff(part, attempts, &error).await;
                }
            }
        }
    }

    async fn upload_attempt(
        &self,
        reader: &PartReader,
        part: &FilePart,
        url: &str,
    ) -> Result<Option<String>, PartError> {
        // Reread from the source every attempt: the previous attempt may
        // have consumed part of the request body before failing.
        let bytes = {
            let reader = reader.clone();
            let part = *part;
            tokio::task::spawn_blocking(move || reader.read_part(&part))
                .await
                .map_err(|e| PartError::fatal(format!("task join error: {e}")))?
                .map_err(|e| PartError::from_io(&e))?
        };

        let response = self.bounded(self.client.put_part(url, bytes)).await??;
        Ok(response.etag)
    }

    async fn download_attempt(
        &self,
        writer: &PartWriter,
        part: &FilePart,
        url: &str,
    ) -> Result<(), PartError> {
        if part.length == 0 {
            // Empty artifact; the prepared target file is already complete.
            return Ok(());
        }

        let data = self
            .bounded(self.client.get_range(url, part.offset, part.length))
            .await??;
        if data.len() as i64 != part.length {
            return Err(PartError::retryable(format!(
                "short range response for part {}: got {} bytes, expected {}",
                part.index,
                data.len(),
                part.length
            )));
        }

        let writer = writer.clone();
        let part = *part;
        tokio::task::spawn_blocking(move || writer.write_part(&part, &data))
            .await
            .map_err(|e| PartError::fatal(format!("task join error: {e}")))?
            .map_err(|e| PartError::from_io(&e))?;
        Ok(())
    }

    /// Runs `fut` under the per-attempt timeout and the cancellation token.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, PartError>>,
    ) -> Result<Result<T, PartError>, PartError> {
        tokio::select! {
            res = tokio::time::timeout(self.settings.part_timeout, fut) => match res {
                Ok(inner) => Ok(inner),
                Err(_) => Err(PartError::retryable(format!(
                    "part attempt timed out after {:?}",
                    self.settings.part_timeout
                ))),
            },
            _ = self.cancel.cancelled() => Err(PartError::retryable("cancelled")),
        }
    }

    fn gives_up(&self, error: &PartError, attempts: u32) -> bool {
        error.is_fatal() || attempts >= self.settings.part_attempts || self.cancel.is_cancelled()
    }

    async fn backoff(&self, part: &FilePart, attempts: u32, error: &PartError) {
        let delay = self.settings.retry_delay * 2u32.pow(attempts - 1);
        debug!(
            part = %part.description(),
            attempt = attempts,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "retrying part"
        );
        tokio::time::sleep(delay).await;
    }
}
