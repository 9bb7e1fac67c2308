use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one finished transfer, successful or not.
///
/// `number_of_parts` and `chunk_size` describe the plan that was executed:
/// a transfer that was not split reports one part covering the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub object_key: String,
    pub file_size: i64,
    pub number_of_parts: u32,
    pub chunk_size: i64,
    pub started_at: DateTime<Utc>,
    pub duration_millis: i64,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub restart_count: u32,
    pub successful: bool,
}

impl TransferSummary {
    /// Enforces the reporting contract: a summary never carries zero parts.
    ///
    /// A zero part count is replaced by a single whole-file part with
    /// `chunk_size == file_size`.
    pub fn normalized(mut self) -> Self {
        if self.number_of_parts == 0 {
            self.number_of_parts = 1;
            self.chunk_size = self.file_size;
        }
        self
    }
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransferSummary {
        TransferSummary {
            object_key: "builds/artifact.zip".into(),
            file_size: 10_000_000,
            number_of_parts: 4,
            chunk_size: 3_000_000,
            started_at: Utc::now(),
            duration_millis: 1234,
            restart_count: 0,
            successful: true,
        }
    }

    #[test]
    fn json_roundtrip() {
        let summary = sample();
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: TransferSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary, parsed);
    }

    #[test]
    fn field_names_are_camel_case() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"objectKey\""));
        assert!(json.contains("\"fileSize\""));
        assert!(json.contains("\"numberOfParts\""));
        assert!(json.contains("\"chunkSize\""));
        assert!(json.contains("\"durationMillis\""));
    }

    #[test]
    fn zero_restart_count_is_omitted() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("restartCount"));

        let mut retried = sample();
        retried.restart_count = 2;
        let json = serde_json::to_string(&retried).unwrap();
        assert!(json.contains("\"restartCount\":2"));
    }

    #[test]
    fn normalized_replaces_zero_parts() {
        let mut summary = sample();
        summary.number_of_parts = 0;
        summary.chunk_size = 0;
        let summary = summary.normalized();
        assert_eq!(summary.number_of_parts, 1);
        assert_eq!(summary.chunk_size, summary.file_size);
    }

    #[test]
    fn normalized_keeps_real_plans() {
        let summary = sample().normalized();
        assert_eq!(summary.number_of_parts, 4);
        assert_eq!(summary.chunk_size, 3_000_000);
    }
}
