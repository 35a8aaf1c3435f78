//! Adapter interfaces for external systems.
//!
//! Everything that leaves the process goes through one of these traits:
//! HTTP fetches, media probing, video downloads, pose rendering, and chart
//! output. The engine and orchestrator only see the traits, so tests swap in
//! in-memory doubles.

pub mod charts;
pub mod ffprobe;
pub mod http;
pub mod pose;
pub mod ytdlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::VideoProbe;
use crate::report::Chart;

pub use charts::JsonChartWriter;
pub use ffprobe::{FfprobeProber, ProbeError};
pub use http::{FetchError, HttpFetcher, TrustPolicy};
pub use pose::{CommandRenderer, RenderError};
pub use ytdlp::{DownloadError, YtDlp};

/// Remote content access
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a document as text
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Download a resource to `dest`, returning the number of bytes written
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Reads intrinsic properties of a local media file
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<VideoProbe, ProbeError>;
}

/// Fetches a hosted video by its identifier into a directory
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    async fn download(&self, video_id: &str, dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// Turns a pose file into a playable video
#[async_trait]
pub trait PoseRenderer: Send + Sync {
    async fn render(&self, pose: &Path, output: &Path) -> Result<(), RenderError>;
}

/// Produces an artifact for an aggregate series
pub trait ChartRenderer {
    fn render(&self, chart: &Chart) -> anyhow::Result<PathBuf>;
}
