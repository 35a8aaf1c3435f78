//! In-memory doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use signcorpus::adapters::{
    DownloadError, FetchError, Fetcher, MediaProber, PoseRenderer, ProbeError, RenderError,
    VideoDownloader,
};
use signcorpus::domain::VideoProbe;

/// Serves pages and files from memory and counts every request
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    /// Number of initial attempts that fail for a URL
    flaky: HashMap<String, u32>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_file(mut self, url: &str, body: &[u8]) -> Self {
        self.files.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn failing_first(mut self, url: &str, attempts: u32) -> Self {
        self.flaky.insert(url.to_string(), attempts);
        self
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn download_calls(&self) -> u32 {
        let calls = self.calls.lock().unwrap();
        calls
            .iter()
            .filter(|(url, _)| !self.pages.contains_key(*url))
            .map(|(_, n)| n)
            .sum()
    }

    fn record(&self, url: &str) -> u32 {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

fn not_found(url: &str) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: 404,
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.record(url);
        self.pages.get(url).cloned().ok_or_else(|| not_found(url))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let attempt = self.record(url);
        if attempt <= self.flaky.get(url).copied().unwrap_or(0) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            });
        }

        let body = self.files.get(url).ok_or_else(|| not_found(url))?;
        tokio::fs::write(dest, body)
            .await
            .map_err(|source| FetchError::Write {
                path: dest.to_path_buf(),
                source,
            })?;
        Ok(body.len() as u64)
    }
}

/// Reports the duration encoded in the file content (`"<seconds>"`)
#[derive(Default)]
pub struct FileProber {
    probed: Mutex<Vec<PathBuf>>,
}

impl FileProber {
    pub fn probed(&self) -> Vec<PathBuf> {
        let mut probed = self.probed.lock().unwrap().clone();
        probed.sort();
        probed
    }
}

#[async_trait]
impl MediaProber for FileProber {
    async fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProbeError::Parse(e.to_string()))?;
        let duration = content
            .trim()
            .parse::<f64>()
            .map_err(|_| ProbeError::NoVideoStream)?;
        Ok(VideoProbe {
            duration,
            width: 640,
            height: 360,
        })
    }
}

/// Writes `<dir>/<id>.mp4`; ids listed as broken always fail
#[derive(Default)]
pub struct FakeDownloader {
    broken: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn with_broken(ids: &[&str]) -> Self {
        Self {
            broken: ids.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl VideoDownloader for FakeDownloader {
    async fn download(&self, video_id: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
        self.calls.lock().unwrap().push(video_id.to_string());
        if self.broken.iter().any(|b| b == video_id) {
            return Err(DownloadError::Failed {
                video_id: video_id.to_string(),
                code: 1,
                stderr: "Video unavailable".to_string(),
            });
        }
        let path = dir.join(format!("{}.mp4", video_id));
        tokio::fs::write(&path, video_id.as_bytes())
            .await
            .map_err(|source| DownloadError::Spawn {
                binary: "fake".to_string(),
                source,
            })?;
        Ok(path)
    }
}

/// Copies the pose file to the output path
#[derive(Default)]
pub struct CopyRenderer {
    calls: Mutex<u32>,
}

impl CopyRenderer {
    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PoseRenderer for CopyRenderer {
    async fn render(&self, pose: &Path, output: &Path) -> Result<(), RenderError> {
        *self.calls.lock().unwrap() += 1;
        tokio::fs::copy(pose, output)
            .await
            .map_err(|source| RenderError::Spawn {
                binary: "fake".to_string(),
                source,
            })?;
        Ok(())
    }
}
