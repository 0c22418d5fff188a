//! Temp-file job storage with TTL-based sweep
//!
//! Uploaded inputs and processed outputs are plain files under one base
//! directory, named by job id. Cleanup is a periodic sweep that deletes
//! anything older than the configured TTL; it is best-effort housekeeping,
//! not a correctness mechanism.

use anyhow::{Result, bail};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Job storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for job files
    pub base_dir: PathBuf,
    /// Age in minutes after which job files are swept
    pub ttl_minutes: u64,
    /// Maximum accepted upload size in megabytes
    pub max_file_mb: u64,
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STORAGE_DIR`: Base directory (default: "<system temp>/metascrub-jobs")
    /// - `FILE_TTL_MINUTES`: Sweep age in minutes (default: 60)
    /// - `MAX_FILE_MB`: Maximum upload size in MB (default: 200)
    pub fn from_env() -> Self {
        let base_dir = std::env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("metascrub-jobs"));

        let ttl_minutes = std::env::var("FILE_TTL_MINUTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(60);

        let max_file_mb = std::env::var("MAX_FILE_MB")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(200);

        StorageConfig {
            base_dir,
            ttl_minutes,
            max_file_mb,
        }
    }
}

/// Filesystem storage for job inputs and outputs
#[derive(Debug, Clone)]
pub struct JobStorage {
    config: StorageConfig,
}

impl JobStorage {
    /// Create a new job storage
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Maximum accepted upload size in bytes
    pub fn max_file_bytes(&self) -> u64 {
        self.config.max_file_mb * 1024 * 1024
    }

    /// Generate a fresh job identifier
    pub fn new_job_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Path for a job's uploaded input
    pub fn input_path(&self, job_id: &str, ext: &str) -> Result<PathBuf> {
        self.job_path(job_id, ext, false)
    }

    /// Path for a job's processed output
    pub fn output_path(&self, job_id: &str, ext: &str) -> Result<PathBuf> {
        self.job_path(job_id, ext, true)
    }

    fn job_path(&self, job_id: &str, ext: &str, output: bool) -> Result<PathBuf> {
        if !valid_component(job_id) || !valid_component(ext) {
            bail!("invalid job id or extension");
        }

        std::fs::create_dir_all(&self.config.base_dir)?;

        let file_name = if output {
            format!("{job_id}.out.{ext}")
        } else {
            format!("{job_id}.{ext}")
        };
        Ok(self.config.base_dir.join(file_name))
    }

    /// Delete job files older than the configured TTL.
    ///
    /// Returns the number of files removed. Failures on individual entries
    /// are logged and skipped; a sweep racing an in-flight job is tolerated.
    pub async fn sweep(&self) -> Result<u64> {
        let ttl = Duration::from_secs(self.config.ttl_minutes * 60);
        let mut removed = 0;

        let mut entries = match tokio::fs::read_dir(&self.config.base_dir).await {
            Ok(entries) => entries,
            // Nothing has been uploaded yet.
            Err(_) => return Ok(0),
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read job storage entry: {}", e);
                    break;
                }
            };

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .unwrap_or(Duration::ZERO);
            if age < ttl {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }

        Ok(removed)
    }
}

/// Job ids and extensions are short alphanumeric tokens; anything else
/// (separators, dots, traversal) is rejected before touching the filesystem.
fn valid_component(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(ttl_minutes: u64) -> JobStorage {
        JobStorage::new(StorageConfig {
            base_dir: std::env::temp_dir()
                .join("metascrub-storage-tests")
                .join(JobStorage::new_job_id()),
            ttl_minutes,
            max_file_mb: 200,
        })
    }

    #[test]
    fn paths_follow_job_naming() {
        let storage = storage(60);
        let job_id = JobStorage::new_job_id();

        let input = storage.input_path(&job_id, "jpg").unwrap();
        let output = storage.output_path(&job_id, "jpg").unwrap();

        assert!(input.ends_with(format!("{job_id}.jpg")));
        assert!(output.ends_with(format!("{job_id}.out.jpg")));
    }

    #[test]
    fn traversal_components_are_rejected() {
        let storage = storage(60);

        assert!(storage.input_path("../etc", "jpg").is_err());
        assert!(storage.input_path("job", "../jpg").is_err());
        assert!(storage.input_path("job", "j/pg").is_err());
        assert!(storage.input_path("", "jpg").is_err());
        assert!(storage.input_path("job", "").is_err());
    }

    #[tokio::test]
    async fn sweep_removes_only_aged_files() {
        // TTL of zero: everything already written counts as expired.
        let expired = storage(0);
        let path = expired.input_path("job1", "bin").unwrap();
        tokio::fs::write(&path, b"data").await.unwrap();
        assert_eq!(expired.sweep().await.unwrap(), 1);
        assert!(!path.exists());

        // Generous TTL: fresh files survive the sweep.
        let fresh = storage(60);
        let path = fresh.input_path("job2", "bin").unwrap();
        tokio::fs::write(&path, b"data").await.unwrap();
        assert_eq!(fresh.sweep().await.unwrap(), 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn sweep_on_missing_directory_is_a_noop() {
        let storage = JobStorage::new(StorageConfig {
            base_dir: std::env::temp_dir().join("metascrub-storage-tests-missing"),
            ttl_minutes: 0,
            max_file_mb: 200,
        });
        assert_eq!(storage.sweep().await.unwrap(), 0);
    }
}
