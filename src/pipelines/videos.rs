//! Hosted video pipeline: download every video of a `video_id,language`
//! listing into one directory per language.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, instrument};

use crate::adapters::{Fetcher, VideoDownloader};
use crate::catalog::{group_by_language, load_listing, AllowList};
use crate::core::{
    file_name_of, BatchOrchestrator, BatchReport, ConflictResolver, Progress, RetryPolicy,
    UnitGroup,
};

const FALLBACK_LISTING_NAME: &str = "listing.csv";

#[derive(Debug, Clone)]
pub struct VideosOptions {
    /// Local path or http(s) URL of the listing
    pub listing: String,
    pub output: PathBuf,
    pub languages: AllowList,
    pub jobs: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
struct VideoJob {
    video_id: String,
    dir: PathBuf,
}

pub struct VideosPipeline {
    fetcher: Arc<dyn Fetcher>,
    downloader: Arc<dyn VideoDownloader>,
    resolver: Box<dyn ConflictResolver>,
    options: VideosOptions,
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

impl VideosPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        downloader: Arc<dyn VideoDownloader>,
        resolver: Box<dyn ConflictResolver>,
        options: VideosOptions,
    ) -> Self {
        Self {
            fetcher,
            downloader,
            resolver,
            options,
        }
    }

    /// Local copy of the listing; a remote listing is fetched into the
    /// output directory first
    async fn listing_path(&self) -> Result<PathBuf> {
        let location = &self.options.listing;
        if !is_remote(location) {
            return Ok(PathBuf::from(location));
        }

        let name = file_name_of(location).unwrap_or_else(|| FALLBACK_LISTING_NAME.to_string());
        let dest = self.options.output.join(name);
        self.fetcher
            .download(location, &dest)
            .await
            .with_context(|| format!("Failed to fetch listing {}", location))?;
        info!(path = %dest.display(), "Listing downloaded");
        Ok(dest)
    }

    #[instrument(skip(self), fields(output = %self.options.output.display()))]
    pub async fn run(&self) -> Result<BatchReport<PathBuf>> {
        let output = &self.options.output;
        fs::create_dir_all(output)
            .await
            .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

        let listing = self.listing_path().await?;
        let rows = load_listing(&listing)?;
        let groups: Vec<UnitGroup<VideoJob>> = group_by_language(rows, &self.options.languages)
            .into_iter()
            .map(|(language, ids)| {
                let dir = output.join(&language);
                UnitGroup {
                    label: language,
                    output: dir.clone(),
                    items: ids
                        .into_iter()
                        .map(|video_id| VideoJob {
                            video_id,
                            dir: dir.clone(),
                        })
                        .collect(),
                }
            })
            .collect();
        info!(languages = groups.len(), "Listing grouped by language");

        let orchestrator = BatchOrchestrator::new(self.options.jobs);
        let planned = orchestrator.plan(groups, self.resolver.as_ref()).await?;

        let progress = Arc::new(Progress::new("Downloading videos", planned.len() as u64));
        let downloader = Arc::clone(&self.downloader);
        let retry = self.options.retry.clone();
        let report = orchestrator
            .run(planned, Arc::clone(&progress), move |job: VideoJob| {
                let downloader = Arc::clone(&downloader);
                let retry = retry.clone();
                async move { download_video(downloader.as_ref(), &retry, &job.video_id, &job.dir).await }
            })
            .await;
        progress.finish();

        Ok(report)
    }
}

async fn download_video(
    downloader: &dyn VideoDownloader,
    retry: &RetryPolicy,
    video_id: &str,
    dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = retry
        .run(video_id, || downloader.download(video_id, dir))
        .await
        .with_context(|| format!("Video {} could not be downloaded", video_id))?;
    info!(video_id, path = %path.display(), "Downloaded");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://storage.example.com/listing.csv"));
        assert!(is_remote("http://host/l.csv"));
        assert!(!is_remote("/data/listing.csv"));
        assert!(!is_remote("listing.csv"));
    }
}
