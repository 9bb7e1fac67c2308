//! Byte-count aggregation across concurrent part workers.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Callback invoked with `(bytes_transferred, total_bytes)` after every
/// confirmed part completion.
pub type ProgressCallback = Box<dyn Fn(i64, i64) + Send + Sync>;

/// Monotonically increasing byte counter, safe for concurrent updates.
///
/// Workers credit a part's bytes only once its transfer is confirmed, so the
/// counter never needs to go back down.
pub struct ProgressTracker {
    transferred: AtomicI64,
    total: i64,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: i64) -> Self {
        Self {
            transferred: AtomicI64::new(0),
            total,
            callback: None,
        }
    }

    /// Attaches the external progress sink.
    pub fn with_callback(total: i64, callback: ProgressCallback) -> Self {
        Self {
            transferred: AtomicI64::new(0),
            total,
            callback: Some(callback),
        }
    }

    /// Credits `bytes` and notifies the sink, if any.
    pub fn add(&self, bytes: i64) {
        self.transferred.fetch_add(bytes, Ordering::Relaxed);
        if let Some(callback) = &self.callback {
            callback(self.snapshot(), self.total);
        }
    }

    /// Bytes confirmed so far. Non-decreasing over the transfer's lifetime.
    pub fn snapshot(&self) -> i64 {
        self.transferred.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.snapshot() >= self.total
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

struct SpeedSample {
    bytes: i64,
    timestamp: Instant,
}

/// Calculates transfer speed using a sliding window of samples.
pub struct SpeedCalculator {
    inner: Mutex<SpeedInner>,
}

struct SpeedInner {
    samples: Vec<SpeedSample>,
    window_size: Duration,
}

impl SpeedCalculator {
    /// Creates a calculator with the given window (default 5 s).
    pub fn new(window_size: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(SpeedInner {
                samples: Vec::new(),
                window_size: window_size.unwrap_or(Duration::from_secs(5)),
            }),
        }
    }

    /// Records a sample of `bytes` transferred at the current instant.
    pub fn add_sample(&self, bytes: i64) {
        let mut s = self.inner.lock().unwrap();
        let now = Instant::now();
        s.samples.push(SpeedSample {
            bytes,
            timestamp: now,
        });

        // Prune samples outside the window.
        let cutoff = now - s.window_size;
        s.samples.retain(|sample| sample.timestamp >= cutoff);
    }

    /// Returns the average speed in bytes/second within the window.
    ///
    /// Returns 0.0 if fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.inner.lock().unwrap();
        if s.samples.len() < 2 {
            return 0.0;
        }

        let first = &s.samples[0];
        let last = &s.samples[s.samples.len() - 1];
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if elapsed.is_zero() {
            return 0.0;
        }

        let total_bytes: i64 = s.samples.iter().map(|sample| sample.bytes).sum();
        total_bytes as f64 / elapsed.as_secs_f64()
    }
}
