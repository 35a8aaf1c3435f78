//! Media probing with ffprobe.
//!
//! Shells out to `ffprobe` and reads the first video stream's duration and
//! dimensions from its JSON output.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

use super::MediaProber;
use crate::domain::VideoProbe;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffprobe exited with {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("No video stream")]
    NoVideoStream,

    #[error("Unreadable probe output: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    duration: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Extract duration and dimensions from ffprobe's JSON
pub fn parse_probe_output(json: &[u8]) -> Result<VideoProbe, ProbeError> {
    let output: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let stream = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(ProbeError::NoVideoStream)?;

    // Some containers only report the duration at format level
    let duration = stream
        .duration
        .as_deref()
        .or_else(|| output.format.as_ref().and_then(|f| f.duration.as_deref()))
        .ok_or_else(|| ProbeError::Parse("video stream has no duration".to_string()))?
        .parse::<f64>()
        .map_err(|e| ProbeError::Parse(format!("duration: {}", e)))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) => (w, h),
        _ => return Err(ProbeError::Parse("video stream has no dimensions".to_string())),
    };

    Ok(VideoProbe {
        duration,
        width,
        height,
    })
}

/// Prober that runs the ffprobe binary
pub struct FfprobeProber {
    binary_path: String,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new()
    }
}

impl FfprobeProber {
    pub fn new() -> Self {
        Self::with_binary_path("ffprobe")
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError> {
        let output = Command::new(&self.binary_path)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                binary: self.binary_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_probe_output(&output.stdout)
    }
}
