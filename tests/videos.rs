//! Hosted Video Pipeline Integration Tests
//!
//! Tests for language grouping, per-language conflicts, and failure isolation.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{FakeDownloader, FakeFetcher};
use signcorpus::catalog::AllowList;
use signcorpus::core::{resolver_for, ConflictPolicy, RetryPolicy};
use signcorpus::pipelines::{VideosOptions, VideosPipeline};
use tempfile::TempDir;

const LISTING: &str = "video_id,language\nabc,de\nxyz,ase\ndef,de\nbroken,ase\n";

fn write_listing(dir: &Path) -> String {
    let path = dir.join("listing.csv");
    std::fs::write(&path, LISTING).unwrap();
    path.to_string_lossy().into_owned()
}

fn options(listing: String, output: &Path, languages: AllowList) -> VideosOptions {
    VideosOptions {
        listing,
        output: output.to_path_buf(),
        languages,
        jobs: 3,
        retry: RetryPolicy::immediate(2),
    }
}

#[tokio::test]
async fn test_videos_grouped_by_language() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("videos");
    let downloader = Arc::new(FakeDownloader::with_broken(&["broken"]));

    let report = VideosPipeline::new(
        Arc::new(FakeFetcher::new()),
        downloader.clone(),
        resolver_for(ConflictPolicy::Replace),
        options(write_listing(temp.path()), &output, AllowList::default()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.done(), 3);
    assert_eq!(report.failed(), 1);
    assert!(output.join("de").join("abc.mp4").exists());
    assert!(output.join("de").join("def.mp4").exists());
    assert!(output.join("ase").join("xyz.mp4").exists());

    // Two attempts for the broken video, one for each of the others
    let calls = downloader.calls();
    assert_eq!(calls.iter().filter(|c| *c == "broken").count(), 2);
    assert_eq!(calls.len(), 5);
}

#[tokio::test]
async fn test_existing_language_skipped() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("videos");
    std::fs::create_dir_all(output.join("de")).unwrap();
    let downloader = Arc::new(FakeDownloader::default());

    let report = VideosPipeline::new(
        Arc::new(FakeFetcher::new()),
        downloader.clone(),
        resolver_for(ConflictPolicy::Skip),
        options(write_listing(temp.path()), &output, AllowList::default()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.skipped(), 2);
    assert_eq!(report.done(), 2);
    assert_eq!(downloader.calls(), vec!["broken", "xyz"]);
    assert!(!output.join("de").join("abc.mp4").exists());
}

#[tokio::test]
async fn test_language_filter() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("videos");
    let downloader = Arc::new(FakeDownloader::default());

    let report = VideosPipeline::new(
        Arc::new(FakeFetcher::new()),
        downloader.clone(),
        resolver_for(ConflictPolicy::Replace),
        options(
            write_listing(temp.path()),
            &output,
            AllowList::new(&["de"]).unwrap(),
        ),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(downloader.calls(), vec!["abc", "def"]);
    assert!(!output.join("ase").exists());
}

#[tokio::test]
async fn test_remote_listing_is_fetched() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("videos");
    let url = "https://storage.example.com/sl/metadata.csv";
    let fetcher = Arc::new(FakeFetcher::new().with_file(url, LISTING.as_bytes()));

    let report = VideosPipeline::new(
        fetcher.clone(),
        Arc::new(FakeDownloader::default()),
        resolver_for(ConflictPolicy::Replace),
        options(url.to_string(), &output, AllowList::default()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(fetcher.calls(url), 1);
    assert!(output.join("metadata.csv").exists());
    assert_eq!(report.done(), 4);
}

#[tokio::test]
async fn test_missing_listing_is_fatal() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("videos");
    let missing = temp.path().join("absent.csv").to_string_lossy().into_owned();

    let result = VideosPipeline::new(
        Arc::new(FakeFetcher::new()),
        Arc::new(FakeDownloader::default()),
        resolver_for(ConflictPolicy::Replace),
        options(missing, &output, AllowList::default()),
    )
    .run()
    .await;

    assert!(result.is_err());
}
