//! Pose Rendering Pipeline Integration Tests

mod common;

use std::sync::Arc;

use common::CopyRenderer;
use signcorpus::core::{resolver_for, ConflictPolicy};
use signcorpus::pipelines::{PosesOptions, PosesPipeline};
use tempfile::TempDir;

#[tokio::test]
async fn test_render_tree_and_skip_existing() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("poses");
    let output = temp.path().join("rendered");
    std::fs::create_dir_all(input.join("s1")).unwrap();
    std::fs::write(input.join("s1").join("a.pose"), b"pose-a").unwrap();
    std::fs::write(input.join("b.pose"), b"pose-b").unwrap();

    // b.mp4 exists already and is kept
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("b.mp4"), b"old").unwrap();

    let renderer = Arc::new(CopyRenderer::default());
    let report = PosesPipeline::new(
        renderer.clone(),
        resolver_for(ConflictPolicy::Skip),
        PosesOptions {
            input,
            output: output.clone(),
            jobs: 2,
        },
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.done(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(renderer.calls(), 1);
    assert_eq!(std::fs::read(output.join("s1").join("a.mp4")).unwrap(), b"pose-a");
    assert_eq!(std::fs::read(output.join("b.mp4")).unwrap(), b"old");
}

#[tokio::test]
async fn test_replace_rerenders_existing() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("b.pose");
    let output = temp.path().join("rendered");
    std::fs::write(&input, b"pose-b").unwrap();
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("b.mp4"), b"old").unwrap();

    let report = PosesPipeline::new(
        Arc::new(CopyRenderer::default()),
        resolver_for(ConflictPolicy::Replace),
        PosesOptions {
            input,
            output: output.clone(),
            jobs: 1,
        },
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.done(), 1);
    assert_eq!(std::fs::read(output.join("b.mp4")).unwrap(), b"pose-b");
}
