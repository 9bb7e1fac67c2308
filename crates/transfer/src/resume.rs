//! Per-part completion ledger.
//!
//! After a dispatch with failures, the ledger tells the coordinator exactly
//! which parts the next dispatch must cover. Completed parts are never
//! transferred again, and the ETags they earned are kept so a restarted
//! multipart upload can still be finalized.

use crate::types::PartOutcome;

/// Completion status of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStatus {
    Pending,
    Completed,
    Failed,
}

/// Tracks which parts of a plan have completed across dispatches.
///
/// Mutated only from the coordinator's dispatch loop; workers report
/// outcomes back rather than touching the ledger themselves.
#[derive(Debug)]
pub struct ResumeState {
    statuses: Vec<PartStatus>,
    etags: Vec<Option<String>>,
}

impl ResumeState {
    pub fn new(part_count: u32) -> Self {
        Self {
            statuses: vec![PartStatus::Pending; part_count as usize],
            etags: vec![None; part_count as usize],
        }
    }

    /// Folds one part outcome into the ledger.
    pub fn record(&mut self, outcome: &PartOutcome) {
        let index = outcome.index as usize;
        if outcome.success {
            self.statuses[index] = PartStatus::Completed;
            self.etags[index] = outcome.etag.clone();
        } else {
            self.statuses[index] = PartStatus::Failed;
        }
    }

    pub fn status(&self, index: u32) -> PartStatus {
        self.statuses[index as usize]
    }

    /// Indices the next dispatch must cover: everything not yet completed.
    pub fn pending_parts(&self) -> Vec<u32> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| **s != PartStatus::Completed)
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Indices that failed in the last dispatch.
    pub fn failed_parts(&self) -> Vec<u32> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == PartStatus::Failed)
            .map(|(i, _)| i as u32)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.statuses.iter().all(|s| *s == PartStatus::Completed)
    }

    pub fn completed_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == PartStatus::Completed)
            .count()
    }

    /// ETags of all parts in part order, if every part has one.
    ///
    /// `None` until the upload is complete or when the store returned no
    /// ETag for some part.
    pub fn etags_in_order(&self) -> Option<Vec<String>> {
        self.etags.iter().cloned().collect()
    }
}
