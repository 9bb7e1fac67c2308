//! Wave-based transfer coordination.
//!
//! A transfer runs as a sequence of waves: dispatch every pending part onto
//! a bounded worker pool, await all outcomes, fold them into the resume
//! ledger. Parts that failed are redispatched in the next wave, bounded by
//! the restart budget, so a transient failure on one part of a 50-part
//! upload costs one part's retry, not the whole file.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cargohold_telemetry::{TelemetrySink, TransferSummary};

use crate::client::{ObjectClient, UrlProvider};
use crate::config::TransferSettings;
use crate::error::{PartError, TransferError};
use crate::fileio::{PartReader, PartWriter};
use crate::part::PartTransfer;
use crate::planner::{Splitability, Splitter};
use crate::progress::{ProgressCallback, ProgressTracker, SpeedCalculator};
use crate::resume::ResumeState;
use crate::types::{PartFailure, PartOutcome, TransferPlan};

/// Lifecycle of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferState {
    Planning,
    Dispatching,
    Awaiting,
    Completed,
    PartiallyFailed,
    Aborted,
}

/// Mutable state of one logical transfer across its waves.
struct TransferContext {
    transfer_id: Uuid,
    object_key: String,
    plan: TransferPlan,
    progress: Arc<ProgressTracker>,
    resume: ResumeState,
    /// Latest outcome per part index.
    outcomes: Vec<Option<PartOutcome>>,
    restart_count: u32,
    state: TransferState,
    speed: SpeedCalculator,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl TransferContext {
    fn new(object_key: String, plan: TransferPlan, progress: Option<ProgressCallback>) -> Self {
        let total = plan.file_size();
        let progress = Arc::new(match progress {
            Some(callback) => ProgressTracker::with_callback(total, callback),
            None => ProgressTracker::new(total),
        });
        let part_count = plan.part_count();
        Self {
            transfer_id: Uuid::new_v4(),
            object_key,
            plan,
            progress,
            resume: ResumeState::new(part_count),
            outcomes: vec![None; part_count as usize],
            restart_count: 0,
            state: TransferState::Planning,
            speed: SpeedCalculator::new(None),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    fn set_state(&mut self, next: TransferState) {
        debug!(
            transfer = %self.transfer_id,
            from = ?self.state,
            to = ?next,
            "state change"
        );
        self.state = next;
    }

    /// Replaces the plan with a whole-file single part, resetting the ledger.
    fn reset_to_whole_file(&mut self) {
        self.plan = TransferPlan::whole_file(self.plan.file_size());
        self.resume = ResumeState::new(1);
        self.outcomes = vec![None];
    }

    fn fold(&mut self, outcome: PartOutcome) {
        self.resume.record(&outcome);
        if outcome.success {
            self.speed.add_sample(outcome.bytes_transferred);
        }
        let idx = outcome.index as usize;
        self.outcomes[idx] = Some(outcome);
    }

    fn first_fatal(&self) -> Option<(u32, String)> {
        self.outcomes.iter().flatten().find_map(|o| {
            o.error
                .as_ref()
                .filter(|e| e.is_fatal())
                .map(|e| (o.index, e.message.clone()))
        })
    }

    /// Failed part indices with their last error messages.
    fn part_failures(&self) -> Vec<PartFailure> {
        self.resume
            .failed_parts()
            .into_iter()
            .map(|index| PartFailure {
                index,
                error: self.outcomes[index as usize]
                    .as_ref()
                    .and_then(|o| o.error.as_ref())
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "unknown".into()),
            })
            .collect()
    }

    fn bytes_transferred(&self) -> i64 {
        self.progress.snapshot()
    }
}

/// I/O wiring of one wave.
enum WaveIo {
    Upload {
        reader: PartReader,
        /// `part_urls[i]` belongs to part index `i`.
        part_urls: Arc<Vec<String>>,
    },
    Download {
        writer: PartWriter,
        url: Arc<String>,
    },
}

/// Runs whole transfers against an object store.
///
/// Owns the validated settings, a cancellation token shared with all part
/// workers, and the client/provider capabilities. One coordinator can run
/// any number of transfers sequentially or concurrently.
pub struct TransferCoordinator {
    client: Arc<dyn ObjectClient>,
    urls: Arc<dyn UrlProvider>,
    settings: TransferSettings,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    cancel: CancellationToken,
}

impl TransferCoordinator {
    /// Creates a coordinator, validating `settings` up front.
    pub fn new(
        client: Arc<dyn ObjectClient>,
        urls: Arc<dyn UrlProvider>,
        settings: TransferSettings,
    ) -> Result<Self, TransferError> {
        settings.validate()?;
        Ok(Self {
            client,
            urls,
            settings,
            telemetry: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Attaches a telemetry sink receiving one summary per transfer.
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Token that cancels all transfers run by this coordinator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `source` to `object_key`.
    ///
    /// Splittable files go through a multipart upload; everything else is a
    /// single PUT against a whole-object URL. Returns the transfer summary
    /// that was also handed to the telemetry sink.
    pub async fn upload(
        &self,
        object_key: &str,
        source: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<TransferSummary, TransferError> {
        let reader = PartReader::new(source);
        let file_size = {
            let r = reader.clone();
            tokio::task::spawn_blocking(move || r.file_size())
                .await
                .map_err(join_io)??
        };

        let (plan, verdict) = Splitter::new(&self.settings).plan(file_size);
        let mut ctx = TransferContext::new(object_key.to_string(), plan, progress);
        if let Splitability::Unsplittable { reason } = &verdict {
            debug!(transfer = %ctx.transfer_id, object_key, %reason, "transferring as a single part");
        }
        info!(
            transfer = %ctx.transfer_id,
            object_key,
            file_size,
            parts = ctx.plan.part_count(),
            "upload started"
        );

        let mut multipart = ctx.plan.is_multipart();
        let part_digests = if multipart && self.settings.check_consistency {
            let r = reader.clone();
            let plan = ctx.plan.clone();
            Some(
                tokio::task::spawn_blocking(move || r.part_digests(&plan))
                    .await
                    .map_err(join_io)??,
            )
        } else {
            None
        };

        let mut upload_id: Option<String> = None;
        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(&mut ctx, upload_id.as_deref()).await;
            }

            // Presigned URLs for this wave. Re-requested every wave because
            // they expire; a multipart request reuses the open upload id.
            let io = if multipart {
                match self
                    .urls
                    .multipart_urls(
                        &ctx.object_key,
                        ctx.plan.part_count(),
                        part_digests.as_deref(),
                        upload_id.as_deref(),
                    )
                    .await
                {
                    Ok(signed) => {
                        let expected_parts = ctx.plan.part_count();
                        if signed.part_urls.len() != expected_parts as usize {
                            return self
                                .aborted(
                                    &mut ctx,
                                    upload_id.as_deref(),
                                    None,
                                    format!(
                                        "provider returned {} part URLs for {} parts",
                                        signed.part_urls.len(),
                                        expected_parts
                                    ),
                                )
                                .await;
                        }
                        upload_id = Some(signed.upload_id);
                        WaveIo::Upload {
                            reader: reader.clone(),
                            part_urls: Arc::new(signed.part_urls),
                        }
                    }
                    Err(error) if error.is_fatal() && upload_id.is_none() => {
                        // The store cannot open a multipart upload for this
                        // object; fall back to a whole-file single shot.
                        warn!(
                            transfer = %ctx.transfer_id,
                            error = %error,
                            "multipart signing failed; falling back to single-shot upload"
                        );
                        ctx.reset_to_whole_file();
                        multipart = false;
                        continue;
                    }
                    Err(error) => {
                        if self.provider_backoff(&mut ctx, &error).await {
                            continue;
                        }
                        return self
                            .aborted(
                                &mut ctx,
                                upload_id.as_deref(),
                                None,
                                format!("presigned URL request failed: {error}"),
                            )
                            .await;
                    }
                }
            } else {
                match self.urls.object_url(&ctx.object_key).await {
                    Ok(url) => WaveIo::Upload {
                        reader: reader.clone(),
                        part_urls: Arc::new(vec![url]),
                    },
                    Err(error) => {
                        if self.provider_backoff(&mut ctx, &error).await {
                            continue;
                        }
                        return self
                            .aborted(
                                &mut ctx,
                                None,
                                None,
                                format!("presigned URL request failed: {error}"),
                            )
                            .await;
                    }
                }
            };

            if let Some(terminal) = self.run_wave(&mut ctx, io, upload_id.as_deref()).await {
                return terminal;
            }

            if ctx.resume.is_complete() {
                if let Some(id) = upload_id.as_deref() {
                    let Some(etags) = ctx.resume.etags_in_order() else {
                        return self
                            .aborted(
                                &mut ctx,
                                Some(id),
                                None,
                                "store returned no ETag for at least one part".into(),
                            )
                            .await;
                    };
                    if let Err(error) = self.complete_with_retry(&ctx.object_key, id, &etags).await
                    {
                        return self
                            .aborted(
                                &mut ctx,
                                Some(id),
                                None,
                                format!("completing multipart upload failed: {error}"),
                            )
                            .await;
                    }
                }
                return Ok(self.completed(&mut ctx));
            }

            if !self.restart_budget_left(&mut ctx) {
                return self.partially_failed(&mut ctx, upload_id.as_deref()).await;
            }
        }
    }

    /// Downloads `object_key` into `dest`.
    ///
    /// `file_size` comes from the artifact's metadata; the target file is
    /// created at that size up front so parts can land in any order.
    pub async fn download(
        &self,
        object_key: &str,
        dest: &Path,
        file_size: i64,
        progress: Option<ProgressCallback>,
    ) -> Result<TransferSummary, TransferError> {
        let writer = PartWriter::new(dest);
        {
            let w = writer.clone();
            tokio::task::spawn_blocking(move || w.prepare(file_size))
                .await
                .map_err(join_io)??;
        }

        let (plan, verdict) = Splitter::new(&self.settings).plan(file_size);
        let mut ctx = TransferContext::new(object_key.to_string(), plan, progress);
        if let Splitability::Unsplittable { reason } = &verdict {
            debug!(transfer = %ctx.transfer_id, object_key, %reason, "transferring as a single part");
        }
        info!(
            transfer = %ctx.transfer_id,
            object_key,
            file_size,
            parts = ctx.plan.part_count(),
            "download started"
        );

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(&mut ctx, None).await;
            }

            let url = match self.urls.object_url(&ctx.object_key).await {
                Ok(url) => url,
                Err(error) => {
                    if self.provider_backoff(&mut ctx, &error).await {
                        continue;
                    }
                    return self
                        .aborted(
                            &mut ctx,
                            None,
                            None,
                            format!("presigned URL request failed: {error}"),
                        )
                        .await;
                }
            };

            let io = WaveIo::Download {
                writer: writer.clone(),
                url: Arc::new(url),
            };
            if let Some(terminal) = self.run_wave(&mut ctx, io, None).await {
                return terminal;
            }

            if ctx.resume.is_complete() {
                return Ok(self.completed(&mut ctx));
            }

            if !self.restart_budget_left(&mut ctx) {
                return self.partially_failed(&mut ctx, None).await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Wave machinery
    // -----------------------------------------------------------------------

    /// Dispatches all pending parts, awaits them, folds the outcomes.
    ///
    /// Returns `Some(terminal)` when the wave ended the transfer (fatal part
    /// error, worker crash, or cancellation), `None` to let the loop decide.
    async fn run_wave(
        &self,
        ctx: &mut TransferContext,
        io: WaveIo,
        upload_id: Option<&str>,
    ) -> Option<Result<TransferSummary, TransferError>> {
        ctx.set_state(TransferState::Dispatching);
        let pending = ctx.resume.pending_parts();
        debug!(
            transfer = %ctx.transfer_id,
            wave_parts = pending.len(),
            restart = ctx.restart_count,
            "dispatching wave"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency as usize));
        let mut workers: JoinSet<PartOutcome> = JoinSet::new();
        for index in pending {
            let part = ctx.plan.parts()[index as usize];
            let client = Arc::clone(&self.client);
            let settings = self.settings.clone();
            let progress = Arc::clone(&ctx.progress);
            let cancel = self.cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            match &io {
                WaveIo::Upload { reader, part_urls } => {
                    let reader = reader.clone();
                    let part_urls = Arc::clone(part_urls);
                    workers.spawn(async move {
                        let _permit = semaphore.acquire_owned().await.expect("pool closed");
                        if cancel.is_cancelled() {
                            return PartOutcome::failed(&part, 0, PartError::retryable("cancelled"));
                        }
                        let unit = PartTransfer::new(&*client, &settings, &progress, &cancel);
                        unit.upload(&reader, &part, &part_urls[part.index as usize])
                            .await
                    });
                }
                WaveIo::Download { writer, url } => {
                    let writer = writer.clone();
                    let url = Arc::clone(url);
                    workers.spawn(async move {
                        let _permit = semaphore.acquire_owned().await.expect("pool closed");
                        if cancel.is_cancelled() {
                            return PartOutcome::failed(&part, 0, PartError::retryable("cancelled"));
                        }
                        let unit = PartTransfer::new(&*client, &settings, &progress, &cancel);
                        unit.download(&writer, &part, &url).await
                    });
                }
            }
        }

        ctx.set_state(TransferState::Awaiting);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => ctx.fold(outcome),
                Err(e) => {
                    return Some(
                        self.aborted(ctx, upload_id, None, format!("part worker failed: {e}"))
                            .await,
                    );
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Some(self.cancelled(ctx, upload_id).await);
        }
        if let Some((index, message)) = ctx.first_fatal() {
            return Some(self.aborted(ctx, upload_id, Some(index), message).await);
        }
        None
    }

    /// Consumes a restart from the budget, if any is left.
    fn restart_budget_left(&self, ctx: &mut TransferContext) -> bool {
        if ctx.restart_count >= self.settings.max_restarts {
            return false;
        }
        ctx.restart_count += 1;
        info!(
            transfer = %ctx.transfer_id,
            restart = ctx.restart_count,
            failed = ?ctx.resume.failed_parts(),
            "redispatching failed parts"
        );
        true
    }

    /// Decides whether a failed provider call consumes a restart.
    async fn provider_backoff(&self, ctx: &mut TransferContext, error: &PartError) -> bool {
        if error.is_fatal()
            || ctx.restart_count >= self.settings.max_restarts
            || self.cancel.is_cancelled()
        {
            return false;
        }
        ctx.restart_count += 1;
        warn!(
            transfer = %ctx.transfer_id,
            error = %error,
            restart = ctx.restart_count,
            "presigned URL request failed; retrying"
        );
        tokio::time::sleep(self.settings.retry_delay).await;
        true
    }

    async fn complete_with_retry(
        &self,
        object_key: &str,
        upload_id: &str,
        etags: &[String],
    ) -> Result<(), PartError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .urls
                .complete_multipart(object_key, upload_id, etags)
                .await
            {
                Ok(()) => return Ok(()),
                Err(error) if !error.is_fatal() && attempts < self.settings.part_attempts => {
                    let delay = self.settings.retry_delay * 2u32.pow(attempts - 1);
                    warn!(
                        object_key,
                        attempt = attempts,
                        error = %error,
                        "multipart completion failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Best-effort release of an open multipart upload.
    async fn try_abort(&self, object_key: &str, upload_id: Option<&str>) {
        if let Some(id) = upload_id {
            match self.urls.abort_multipart(object_key, id).await {
                Ok(()) => debug!(object_key, "aborted multipart upload"),
                Err(error) => {
                    warn!(object_key, error = %error, "failed to abort multipart upload");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Terminal transitions
    // -----------------------------------------------------------------------

    fn completed(&self, ctx: &mut TransferContext) -> TransferSummary {
        ctx.set_state(TransferState::Completed);
        let summary = self.record_summary(ctx, true);
        info!(
            transfer = %ctx.transfer_id,
            object_key = %ctx.object_key,
            parts = ctx.plan.part_count(),
            restarts = ctx.restart_count,
            bytes_per_second = ctx.speed.bytes_per_second(),
            "transfer complete"
        );
        summary
    }

    async fn aborted(
        &self,
        ctx: &mut TransferContext,
        upload_id: Option<&str>,
        part_index: Option<u32>,
        message: String,
    ) -> Result<TransferSummary, TransferError> {
        ctx.set_state(TransferState::Aborted);
        self.try_abort(&ctx.object_key, upload_id).await;
        self.record_summary(ctx, false);
        Err(TransferError::Fatal {
            object_key: ctx.object_key.clone(),
            part_index,
            bytes_transferred: ctx.bytes_transferred(),
            restart_count: ctx.restart_count,
            message,
        })
    }

    async fn partially_failed(
        &self,
        ctx: &mut TransferContext,
        upload_id: Option<&str>,
    ) -> Result<TransferSummary, TransferError> {
        ctx.set_state(TransferState::PartiallyFailed);
        self.try_abort(&ctx.object_key, upload_id).await;
        self.record_summary(ctx, false);
        Err(TransferError::PartialFailure {
            object_key: ctx.object_key.clone(),
            failed_parts: ctx.part_failures(),
            bytes_transferred: ctx.bytes_transferred(),
            restart_count: ctx.restart_count,
        })
    }

    async fn cancelled(
        &self,
        ctx: &mut TransferContext,
        upload_id: Option<&str>,
    ) -> Result<TransferSummary, TransferError> {
        ctx.set_state(TransferState::Aborted);
        self.try_abort(&ctx.object_key, upload_id).await;
        self.record_summary(ctx, false);
        Err(TransferError::Cancelled {
            object_key: ctx.object_key.clone(),
            bytes_transferred: ctx.bytes_transferred(),
        })
    }

    fn record_summary(&self, ctx: &TransferContext, successful: bool) -> TransferSummary {
        let summary = TransferSummary {
            object_key: ctx.object_key.clone(),
            file_size: ctx.plan.file_size(),
            number_of_parts: ctx.plan.part_count(),
            chunk_size: ctx.plan.chunk_size(),
            started_at: ctx.started_at,
            duration_millis: ctx.started.elapsed().as_millis() as i64,
            restart_count: ctx.restart_count,
            successful,
        }
        .normalized();
        if let Some(sink) = &self.telemetry {
            sink.record(&summary);
        }
        summary
    }
}

fn join_io(e: tokio::task::JoinError) -> std::io::Error {
    std::io::Error::other(format!("task join error: {e}"))
}
