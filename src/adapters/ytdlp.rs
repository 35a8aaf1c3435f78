//! Hosted-video downloads through yt-dlp.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use super::VideoDownloader;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yt-dlp failed for {video_id} (exit {code}): {stderr}")]
    Failed {
        video_id: String,
        code: i32,
        stderr: String,
    },
}

/// Downloader that runs the yt-dlp binary
pub struct YtDlp {
    binary_path: String,
    url_prefix: String,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_binary_path("yt-dlp")
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            url_prefix: "https://www.youtube.com/watch?v=".to_string(),
        }
    }

    fn video_url(&self, video_id: &str) -> String {
        format!("{}{}", self.url_prefix, video_id)
    }

    /// Output template: `<id>_<sanitized title>.mp4`
    fn output_template(dir: &Path, video_id: &str) -> PathBuf {
        dir.join(format!("{}_%(title)s.%(ext)s", video_id))
    }
}

#[async_trait]
impl VideoDownloader for YtDlp {
    async fn download(&self, video_id: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
        let output = Command::new(&self.binary_path)
            .args(["--no-warnings", "--no-progress", "--restrict-filenames"])
            .args(["-f", "best[ext=mp4]/best"])
            .args(["--print", "after_move:filepath"])
            .arg("-o")
            .arg(Self::output_template(dir, video_id))
            .arg(self.video_url(video_id))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DownloadError::Spawn {
                binary: self.binary_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DownloadError::Failed {
                video_id: video_id.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let printed = String::from_utf8_lossy(&output.stdout);
        let path = printed
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| PathBuf::from(l.trim()))
            .unwrap_or_else(|| dir.join(video_id));
        Ok(path)
    }
}
