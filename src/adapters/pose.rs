//! Pose visualization through an external command.
//!
//! The default command is `visualize_pose -i <pose> -o <video>` from the
//! pose-format tooling.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use super::PoseRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rendering {pose} failed (exit {code}): {stderr}")]
    Failed {
        pose: String,
        code: i32,
        stderr: String,
    },

    #[error("Renderer reported success but {0} was not written")]
    MissingOutput(String),
}

/// Renderer that shells out to a pose visualizer
pub struct CommandRenderer {
    binary_path: String,
}

impl Default for CommandRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRenderer {
    pub fn new() -> Self {
        Self::with_binary_path("visualize_pose")
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl PoseRenderer for CommandRenderer {
    async fn render(&self, pose: &Path, output: &Path) -> Result<(), RenderError> {
        let result = Command::new(&self.binary_path)
            .arg("-i")
            .arg(pose)
            .arg("-o")
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                binary: self.binary_path.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(RenderError::Failed {
                pose: pose.display().to_string(),
                code: result.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if !output.exists() {
            return Err(RenderError::MissingOutput(output.display().to_string()));
        }

        Ok(())
    }
}
