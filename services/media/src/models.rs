//! Request and response bodies for the processing gateway

use serde::{Deserialize, Serialize};

use crate::metadata::{EditFields, MediaKind, ProcessMode};

/// Request for a presigned upload URL
#[derive(Debug, Deserialize)]
pub struct UploadUrlRequest {
    pub filename: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

/// Response carrying the presigned PUT URL and the public file URL
#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "fileUrl")]
    pub file_url: String,
}

/// Response for a completed scan
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub ok: bool,
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub ext: String,
    pub meta: serde_json::Value,
    #[serde(rename = "originalName")]
    pub original_name: String,
}

/// Request to strip or edit a previously scanned job
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub ext: String,
    pub kind: MediaKind,
    pub mode: ProcessMode,
    #[serde(default)]
    pub fields: EditFields,
}

/// Response pointing at the processed output
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub ok: bool,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
}

/// Query parameters for the download endpoint
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub ext: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_request_accepts_wire_casing() {
        let request: ProcessRequest = serde_json::from_str(
            r#"{"jobId":"abc","ext":"jpg","kind":"image","mode":"edit","fields":{"author":"Alice","dateTimeOriginal":"2024:01:01 10:00:00"}}"#,
        )
        .unwrap();

        assert_eq!(request.job_id, "abc");
        assert_eq!(request.kind, MediaKind::Image);
        assert_eq!(request.mode, ProcessMode::Edit);
        assert_eq!(request.fields.author.as_deref(), Some("Alice"));
        assert_eq!(
            request.fields.date_time_original.as_deref(),
            Some("2024:01:01 10:00:00")
        );
    }

    #[test]
    fn process_request_fields_default_to_empty() {
        let request: ProcessRequest = serde_json::from_str(
            r#"{"jobId":"abc","ext":"mp4","kind":"video","mode":"strip"}"#,
        )
        .unwrap();

        assert!(request.fields.author.is_none());
        assert!(request.fields.title.is_none());
    }

    #[test]
    fn scan_response_serializes_wire_casing() {
        let response = ScanResponse {
            ok: true,
            job_id: "abc".to_string(),
            ext: "jpg".to_string(),
            meta: serde_json::json!({}),
            original_name: "photo.jpg".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"jobId\":\"abc\""));
        assert!(json.contains("\"originalName\":\"photo.jpg\""));
    }
}
