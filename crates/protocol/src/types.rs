use serde::{Deserialize, Serialize};

/// Storage profile settings as persisted by the configuring system.
///
/// This is the raw document; the engine validates it into its runtime
/// settings before any transfer starts. Unknown values are therefore kept
/// as-is here rather than clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    /// Identifies the storage flavor this profile targets, e.g. `"s3"` or
    /// `"s3-compatible"`. Carried as data; behavior does not branch on it.
    #[serde(default = "default_storage_type")]
    pub storage_type_id: String,
    /// Part size for multipart transfers, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: i64,
    /// Files below this size are transferred in a single request.
    #[serde(default = "default_min_multipart_size")]
    pub min_multipart_size_bytes: i64,
    /// Upper bound on the number of parts the store accepts per object.
    #[serde(default = "default_part_count_cap")]
    pub part_count_cap: u32,
    /// Maximum parts in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
    /// Maximum redispatches of failed parts after the first attempt.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    /// Network attempts per part within one dispatch.
    #[serde(default = "default_part_attempts")]
    pub part_attempts: u32,
    /// Base delay between part attempts; doubles per attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Time budget for a single part attempt.
    #[serde(default = "default_part_timeout_secs")]
    pub part_timeout_secs: u64,
    /// Compute per-part SHA-256 digests and send them to the provider.
    #[serde(default)]
    pub check_consistency: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            storage_type_id: default_storage_type(),
            chunk_size_bytes: default_chunk_size(),
            min_multipart_size_bytes: default_min_multipart_size(),
            part_count_cap: default_part_count_cap(),
            max_concurrency: default_max_concurrency(),
            max_restarts: default_max_restarts(),
            part_attempts: default_part_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            part_timeout_secs: default_part_timeout_secs(),
            check_consistency: false,
        }
    }
}

fn default_storage_type() -> String {
    "s3".to_string()
}

fn default_chunk_size() -> i64 {
    8 * 1024 * 1024
}

fn default_min_multipart_size() -> i64 {
    32 * 1024 * 1024
}

fn default_part_count_cap() -> u32 {
    10_000
}

fn default_max_concurrency() -> u32 {
    4
}

fn default_max_restarts() -> u32 {
    5
}

fn default_part_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_part_timeout_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gets_defaults() {
        let settings: StorageSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, StorageSettings::default());
        assert_eq!(settings.chunk_size_bytes, 8 * 1024 * 1024);
        assert_eq!(settings.part_count_cap, 10_000);
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let settings: StorageSettings =
            serde_json::from_str(r#"{"chunkSizeBytes": 5242880, "maxConcurrency": 16}"#).unwrap();
        assert_eq!(settings.chunk_size_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.max_concurrency, 16);
        assert_eq!(settings.max_restarts, 5);
    }

    #[test]
    fn json_roundtrip() {
        let settings = StorageSettings {
            storage_type_id: "s3-compatible".into(),
            check_consistency: true,
            ..StorageSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"storageTypeId\":\"s3-compatible\""));
        let parsed: StorageSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn invalid_values_survive_parsing() {
        // Validation is the engine's job; the document layer keeps what it
        // was given.
        let settings: StorageSettings =
            serde_json::from_str(r#"{"chunkSizeBytes": -1}"#).unwrap();
        assert_eq!(settings.chunk_size_bytes, -1);
    }
}
