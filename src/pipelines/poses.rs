//! Pose rendering pipeline: turn every `.pose` file under an input
//! directory into a video at the same relative location under the output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, instrument};

use crate::adapters::PoseRenderer;
use crate::core::{BatchOrchestrator, BatchReport, ConflictResolver, Progress, UnitGroup};

pub const POSE_EXTENSION: &str = "pose";
pub const VIDEO_EXTENSION: &str = "mp4";

#[derive(Debug, Clone)]
pub struct PosesOptions {
    /// A directory searched recursively, or a single pose file
    pub input: PathBuf,
    pub output: PathBuf,
    pub jobs: usize,
}

/// One pose file and the video it becomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub pose: PathBuf,
    pub video: PathBuf,
}

/// Find pose files and map each to `<output>/<relative path>.mp4`
pub fn discover(input: &Path, output: &Path) -> Result<Vec<RenderJob>> {
    if input.is_file() {
        let name = input
            .file_name()
            .with_context(|| format!("Not a file path: {}", input.display()))?;
        return Ok(vec![RenderJob {
            pose: input.to_path_buf(),
            video: output.join(name).with_extension(VIDEO_EXTENSION),
        }]);
    }

    let root = input
        .to_str()
        .with_context(|| format!("Input path is not valid UTF-8: {}", input.display()))?;
    let pattern = format!("{}/**/*.{}", glob::Pattern::escape(root), POSE_EXTENSION);

    let mut jobs = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid pose search pattern")? {
        let pose = entry.context("Failed to read pose directory entry")?;
        if !pose.is_file() {
            continue;
        }
        let relative = pose
            .strip_prefix(input)
            .with_context(|| format!("{} is outside {}", pose.display(), input.display()))?;
        jobs.push(RenderJob {
            video: output.join(relative).with_extension(VIDEO_EXTENSION),
            pose,
        });
    }
    Ok(jobs)
}

pub struct PosesPipeline {
    renderer: Arc<dyn PoseRenderer>,
    resolver: Box<dyn ConflictResolver>,
    options: PosesOptions,
}

impl PosesPipeline {
    pub fn new(
        renderer: Arc<dyn PoseRenderer>,
        resolver: Box<dyn ConflictResolver>,
        options: PosesOptions,
    ) -> Self {
        Self {
            renderer,
            resolver,
            options,
        }
    }

    #[instrument(skip(self), fields(input = %self.options.input.display()))]
    pub async fn run(&self) -> Result<BatchReport<PathBuf>> {
        let jobs = discover(&self.options.input, &self.options.output)?;
        info!(files = jobs.len(), "Pose files found");

        let groups = jobs
            .into_iter()
            .map(|job| UnitGroup::single(job.pose.display().to_string(), job.video.clone(), job))
            .collect();

        let orchestrator = BatchOrchestrator::new(self.options.jobs);
        let planned = orchestrator.plan(groups, self.resolver.as_ref()).await?;

        let progress = Arc::new(Progress::new("Rendering poses", planned.len() as u64));
        let renderer = Arc::clone(&self.renderer);
        let report = orchestrator
            .run(planned, Arc::clone(&progress), move |job: RenderJob| {
                let renderer = Arc::clone(&renderer);
                async move {
                    if let Some(parent) = job.video.parent() {
                        fs::create_dir_all(parent)
                            .await
                            .with_context(|| format!("Failed to create {}", parent.display()))?;
                    }
                    renderer
                        .render(&job.pose, &job.video)
                        .await
                        .with_context(|| format!("Failed to render {}", job.pose.display()))?;
                    info!(video = %job.video.display(), "Video saved");
                    anyhow::Ok(job.video)
                }
            })
            .await;
        progress.finish();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_maps_relative_paths() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("poses");
        std::fs::create_dir_all(input.join("de").join("s1")).unwrap();
        std::fs::write(input.join("top.pose"), b"").unwrap();
        std::fs::write(input.join("de").join("s1").join("clip.pose"), b"").unwrap();
        std::fs::write(input.join("de").join("notes.txt"), b"").unwrap();

        let output = temp.path().join("videos");
        let mut jobs = discover(&input, &output).unwrap();
        jobs.sort_by(|a, b| a.pose.cmp(&b.pose));

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].video, output.join("de").join("s1").join("clip.mp4"));
        assert_eq!(jobs[1].video, output.join("top.mp4"));
    }

    #[test]
    fn test_discover_single_file() {
        let temp = TempDir::new().unwrap();
        let pose = temp.path().join("single.pose");
        std::fs::write(&pose, b"").unwrap();

        let jobs = discover(&pose, Path::new("/out")).unwrap();
        assert_eq!(
            jobs,
            vec![RenderJob {
                pose,
                video: PathBuf::from("/out/single.mp4"),
            }]
        );
    }
}
