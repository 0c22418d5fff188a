//! Metadata engine: subprocess glue around exiftool, ffprobe and ffmpeg
//!
//! Images are handled by exiftool, videos by ffprobe (scan) and ffmpeg
//! (strip/edit). The tools are external collaborators; this module only
//! builds argument lists, runs the process, and parses structured output.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Kind of media a job operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// What to do with the embedded metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    Strip,
    Edit,
}

/// Writable metadata fields for edit mode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditFields {
    pub author: Option<String>,
    pub title: Option<String>,
    pub comment: Option<String>,
    #[serde(rename = "dateTimeOriginal")]
    pub date_time_original: Option<String>,
}

/// Read all embedded metadata from `input` as a JSON document.
pub async fn scan(kind: MediaKind, input: &Path) -> Result<serde_json::Value> {
    info!("Scanning {:?} metadata from {}", kind, input.display());

    match kind {
        MediaKind::Image => {
            let stdout = run(
                "exiftool",
                &[
                    "-json".to_string(),
                    "-G".to_string(),
                    "-a".to_string(),
                    "-s".to_string(),
                    input.display().to_string(),
                ],
            )
            .await?;
            let parsed: serde_json::Value = serde_json::from_str(&stdout)?;
            // exiftool emits a one-element array per input file.
            Ok(parsed
                .as_array()
                .and_then(|entries| entries.first())
                .cloned()
                .unwrap_or_else(|| serde_json::json!({})))
        }
        MediaKind::Video => {
            let stdout = run(
                "ffprobe",
                &[
                    "-v".to_string(),
                    "quiet".to_string(),
                    "-print_format".to_string(),
                    "json".to_string(),
                    "-show_format".to_string(),
                    "-show_streams".to_string(),
                    input.display().to_string(),
                ],
            )
            .await?;
            Ok(serde_json::from_str(&stdout)?)
        }
    }
}

/// Remove all embedded metadata, writing the result to `output`.
pub async fn strip(kind: MediaKind, input: &Path, output: &Path) -> Result<()> {
    info!(
        "Stripping {:?} metadata: {} -> {}",
        kind,
        input.display(),
        output.display()
    );

    match kind {
        MediaKind::Image => {
            run("exiftool", &strip_image_args(input, output)).await?;
        }
        MediaKind::Video => {
            run("ffmpeg", &strip_video_args(input, output)).await?;
        }
    }

    ensure_output(output)
}

/// Overwrite selected metadata fields, writing the result to `output`.
pub async fn edit(kind: MediaKind, input: &Path, output: &Path, fields: &EditFields) -> Result<()> {
    info!(
        "Editing {:?} metadata: {} -> {}",
        kind,
        input.display(),
        output.display()
    );

    match kind {
        MediaKind::Image => {
            run("exiftool", &edit_image_args(input, output, fields)).await?;
        }
        MediaKind::Video => {
            run("ffmpeg", &edit_video_args(input, output, fields)).await?;
        }
    }

    ensure_output(output)
}

fn strip_image_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-all=".to_string(),
        "-o".to_string(),
        output.display().to_string(),
        input.display().to_string(),
    ]
}

fn edit_image_args(input: &Path, output: &Path, fields: &EditFields) -> Vec<String> {
    let mut args = vec!["-o".to_string(), output.display().to_string()];
    if let Some(author) = &fields.author {
        args.push(format!("-Artist={author}"));
    }
    if let Some(title) = &fields.title {
        args.push(format!("-Title={title}"));
    }
    if let Some(comment) = &fields.comment {
        args.push(format!("-Comment={comment}"));
    }
    if let Some(date) = &fields.date_time_original {
        args.push(format!("-DateTimeOriginal={date}"));
    }
    args.push(input.display().to_string());
    args
}

fn strip_video_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-map_metadata".to_string(),
        "-1".to_string(),
        "-c".to_string(),
        "copy".to_string(),
        output.display().to_string(),
    ]
}

fn edit_video_args(input: &Path, output: &Path, fields: &EditFields) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
    ];
    if let Some(title) = &fields.title {
        args.push("-metadata".to_string());
        args.push(format!("title={title}"));
    }
    if let Some(comment) = &fields.comment {
        args.push("-metadata".to_string());
        args.push(format!("comment={comment}"));
    }
    if let Some(author) = &fields.author {
        args.push("-metadata".to_string());
        args.push(format!("artist={author}"));
    }
    args.push(output.display().to_string());
    args
}

/// Run a tool and return its stdout; a non-zero exit carries stderr.
async fn run(program: &str, args: &[String]) -> Result<String> {
    let output = Command::new(program).args(args).output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        if detail.is_empty() {
            return Err(anyhow!("{program} failed with status {}", output.status));
        }
        return Err(anyhow!("{program} failed: {detail}"));
    }

    Ok(String::from_utf8(output.stdout)?)
}

fn ensure_output(output: &Path) -> Result<()> {
    if !output.exists() {
        return Err(anyhow!("output file was not created"));
    }
    Ok(())
}
