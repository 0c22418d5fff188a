//! Presigned upload URLs for object storage
//!
//! Large files go straight from the browser to the bucket: the gateway hands
//! out a short-lived presigned PUT URL plus the public URL the object will be
//! served from. Works against S3 or any S3-compatible store (R2, MinIO) via
//! the SDK's endpoint configuration.

use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;
use uuid::Uuid;

/// Presigned upload configuration
#[derive(Debug, Clone)]
pub struct PresignConfig {
    /// Bucket receiving direct uploads
    pub bucket: String,
    /// Public base URL the bucket is served from
    pub public_base_url: String,
    /// Presigned URL validity in seconds
    pub url_ttl_secs: u64,
}

impl PresignConfig {
    /// Create a new PresignConfig from environment variables.
    ///
    /// Returns `None` when the bucket is not configured; direct uploads are
    /// then disabled rather than half-configured.
    ///
    /// # Environment Variables
    /// - `UPLOAD_BUCKET`: Bucket name (unset disables direct uploads)
    /// - `UPLOAD_PUBLIC_BASE_URL`: Public base URL for uploaded objects
    /// - `UPLOAD_URL_TTL_SECS`: Presigned URL validity (default: 60)
    pub fn from_env() -> Option<Self> {
        let bucket = std::env::var("UPLOAD_BUCKET").ok().filter(|v| !v.is_empty())?;
        let public_base_url = std::env::var("UPLOAD_PUBLIC_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())?;

        let url_ttl_secs = std::env::var("UPLOAD_URL_TTL_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(60);

        Some(PresignConfig {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            url_ttl_secs,
        })
    }
}

/// Hands out presigned upload URLs
#[derive(Clone)]
pub struct Uploads {
    client: Client,
    config: PresignConfig,
}

impl Uploads {
    /// Create a new upload URL service
    pub fn new(client: Client, config: PresignConfig) -> Self {
        Self { client, config }
    }

    /// Presign a PUT for one object and return `(upload_url, file_url)`.
    ///
    /// The key is prefixed with the lead id and a timestamp, so uploads never
    /// collide and every object is attributable to the lead that created it.
    pub async fn create_upload_url(
        &self,
        lead_id: Uuid,
        filename: &str,
        content_type: &str,
    ) -> Result<(String, String)> {
        let key = format!(
            "{}/{}-{}",
            lead_id,
            chrono::Utc::now().timestamp_millis(),
            safe_name(filename)
        );

        let presigning = PresigningConfig::expires_in(Duration::from_secs(self.config.url_ttl_secs))
            .context("invalid presigned URL lifetime")?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .context("failed to presign upload")?;

        let upload_url = presigned.uri().to_string();
        let file_url = format!("{}/{}", self.config.public_base_url, key);

        Ok((upload_url, file_url))
    }
}

/// Reduce a client-supplied filename to a safe object key component.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
