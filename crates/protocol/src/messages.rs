use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Requests presigned URLs for one object.
///
/// With `number_of_parts == 0` the provider returns a single whole-object
/// URL. With a positive part count it opens (or, when `upload_id` is set,
/// continues) a multipart upload and returns one URL per part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlRequest {
    pub object_key: String,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub number_of_parts: u32,
    /// Hex SHA-256 digest per part, in part order. Optional consistency
    /// check material the provider may pass through to the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_digests: Option<Vec<String>>,
    /// Set when re-requesting URLs for an already-open multipart upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
}

/// Finalizes a multipart upload from the received part ETags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartCompleteRequest {
    pub object_key: String,
    pub upload_id: String,
    /// ETags in part order.
    pub etags: Vec<String>,
}

/// Abandons a multipart upload and releases its stored parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartAbortRequest {
    pub object_key: String,
    pub upload_id: String,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Provider answer to a [`PresignedUrlRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlResponse {
    pub object_key: String,
    /// Whole-object URL; set for single-shot requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Multipart upload identifier; set for multipart requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub part_urls: Vec<PresignedPartUrl>,
}

/// One presigned part URL.
///
/// Part numbers are 1-based on the wire, matching the object-storage
/// multipart API; the engine's 0-based part indices are converted at this
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedPartUrl {
    pub part_number: u32,
    pub url: String,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_shot_request_omits_multipart_fields() {
        let req = PresignedUrlRequest {
            object_key: "builds/42/app.zip".into(),
            number_of_parts: 0,
            part_digests: None,
            upload_id: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"objectKey\""));
        assert!(!json.contains("numberOfParts"));
        assert!(!json.contains("partDigests"));
        assert!(!json.contains("uploadId"));
    }

    #[test]
    fn multipart_request_roundtrip() {
        let req = PresignedUrlRequest {
            object_key: "builds/42/app.zip".into(),
            number_of_parts: 3,
            part_digests: Some(vec!["aa".into(), "bb".into(), "cc".into()]),
            upload_id: Some("upload-1".into()),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"numberOfParts\":3"));
        let parsed: PresignedUrlRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, parsed);
    }

    #[test]
    fn response_roundtrip_with_parts() {
        let resp = PresignedUrlResponse {
            object_key: "builds/42/app.zip".into(),
            url: None,
            upload_id: Some("upload-1".into()),
            part_urls: vec![
                PresignedPartUrl {
                    part_number: 1,
                    url: "https://bucket/key?partNumber=1".into(),
                },
                PresignedPartUrl {
                    part_number: 2,
                    url: "https://bucket/key?partNumber=2".into(),
                },
            ],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"partNumber\":1"));
        let parsed: PresignedUrlResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(resp, parsed);
    }

    #[test]
    fn response_omits_empty_part_list() {
        let resp = PresignedUrlResponse {
            object_key: "k".into(),
            url: Some("https://bucket/k".into()),
            upload_id: None,
            part_urls: Vec::new(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("partUrls"));
    }

    #[test]
    fn complete_request_keeps_etag_order() {
        let req = MultipartCompleteRequest {
            object_key: "k".into(),
            upload_id: "u".into(),
            etags: vec!["e1".into(), "e2".into(), "e3".into()],
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: MultipartCompleteRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.etags, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn abort_request_roundtrip() {
        let req = MultipartAbortRequest {
            object_key: "k".into(),
            upload_id: "u".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: MultipartAbortRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, parsed);
    }
}
