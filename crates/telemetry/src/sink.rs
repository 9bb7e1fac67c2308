use tracing::info;

use crate::TransferSummary;

/// Receives a summary for every finished transfer.
///
/// Implementations must tolerate being called from multiple transfers
/// concurrently.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, summary: &TransferSummary);
}

/// Sink that emits summaries as structured log records.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn record(&self, summary: &TransferSummary) {
        info!(
            target: "cargohold::telemetry",
            object_key = %summary.object_key,
            file_size = summary.file_size,
            number_of_parts = summary.number_of_parts,
            chunk_size = summary.chunk_size,
            duration_millis = summary.duration_millis,
            restart_count = summary.restart_count,
            successful = summary.successful,
            "transfer finished"
        );
    }
}
