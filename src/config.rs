//! Configuration for signcorpus runs.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags, with `SIGNCORPUS_OUTPUT` / `SIGNCORPUS_JOBS`
//!    environment fallbacks (handled by the CLI)
//! 2. Config file (.signcorpus/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .signcorpus/config.yaml
//! - Paths in the config file are relative to the directory holding .signcorpus/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::TrustPolicy;
use crate::core::{ConflictPolicy, RetryPolicy};

pub const DEFAULT_INDEX_URL: &str =
    "https://www.sign-lang.uni-hamburg.de/meinedgs/ling/start-name_en.html";
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://www.sign-lang.uni-hamburg.de/meinedgs/";
pub const DEFAULT_LISTING: &str =
    "https://storage.googleapis.com/gresearch/youtube-sl-25/youtube-sl-25-metadata.csv";
pub const DEFAULT_LEDGER_FILE: &str = "dgs_korpus_paths.csv";
pub const DEFAULT_METADATA_FILE: &str = "dgs_korpus_metadata.csv";

const CONFIG_DIR: &str = ".signcorpus";
const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub conflict: Option<ConflictPolicy>,
    /// `default`, `disabled`, or a certificate path
    #[serde(default)]
    pub trust: Option<TrustPolicy>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub korpus: KorpusConfig,
    #[serde(default)]
    pub videos: VideosConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KorpusConfig {
    pub output: Option<String>,
    pub index_url: Option<String>,
    pub download_base: Option<String>,
    pub ledger_file: Option<String>,
    pub metadata_file: Option<String>,
    #[serde(default)]
    pub age_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideosConfig {
    pub output: Option<String>,
    pub listing: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    pub ffprobe: Option<String>,
    pub yt_dlp: Option<String>,
    pub visualize_pose: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub jobs: usize,
    pub conflict: ConflictPolicy,
    pub trust: TrustPolicy,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub korpus: KorpusSettings,
    pub videos: VideoSettings,
    pub tools: ToolSettings,
}

#[derive(Debug, Clone)]
pub struct KorpusSettings {
    pub output: PathBuf,
    pub index_url: String,
    pub download_base: String,
    pub ledger_file: String,
    pub metadata_file: String,
    pub age_groups: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub output: PathBuf,
    /// Local path or URL of the `video_id,language` listing
    pub listing: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub ffprobe: String,
    pub yt_dlp: String,
    pub visualize_pose: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
            yt_dlp: "yt-dlp".to_string(),
            visualize_pose: "visualize_pose".to_string(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Build the resolved configuration from an optional config file
fn resolve(file: ConfigFile, config_file: Option<PathBuf>, data_dir: &Path) -> Result<ResolvedConfig> {
    // Base directory is the parent of .signcorpus/
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let default_root = data_dir.join("signcorpus");

    let retry = file.retry.unwrap_or_default();
    retry.validate().context("Invalid retry policy in config file")?;

    let jobs = file.jobs.unwrap_or(1);
    if jobs == 0 {
        anyhow::bail!("jobs must be at least 1");
    }

    let defaults = ToolSettings::default();

    Ok(ResolvedConfig {
        jobs,
        conflict: file.conflict.unwrap_or_default(),
        trust: file.trust.unwrap_or_default(),
        retry,
        timeout: Duration::from_secs(file.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        korpus: KorpusSettings {
            output: file
                .korpus
                .output
                .map(|p| resolve_path(&base_dir, &p))
                .unwrap_or_else(|| default_root.join("dgs_korpus")),
            index_url: file
                .korpus
                .index_url
                .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
            download_base: file
                .korpus
                .download_base
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_BASE.to_string()),
            ledger_file: file
                .korpus
                .ledger_file
                .unwrap_or_else(|| DEFAULT_LEDGER_FILE.to_string()),
            metadata_file: file
                .korpus
                .metadata_file
                .unwrap_or_else(|| DEFAULT_METADATA_FILE.to_string()),
            age_groups: file.korpus.age_groups,
        },
        videos: VideoSettings {
            output: file
                .videos
                .output
                .map(|p| resolve_path(&base_dir, &p))
                .unwrap_or_else(|| default_root.join("youtube_sl_25")),
            listing: file
                .videos
                .listing
                .unwrap_or_else(|| DEFAULT_LISTING.to_string()),
            languages: file.videos.languages,
        },
        tools: ToolSettings {
            ffprobe: file.tools.ffprobe.unwrap_or(defaults.ffprobe),
            yt_dlp: file.tools.yt_dlp.unwrap_or(defaults.yt_dlp),
            visualize_pose: file.tools.visualize_pose.unwrap_or(defaults.visualize_pose),
        },
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let data_dir = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .context("Failed to determine data directory")?;

    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    resolve(file, config_file, &data_dir)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
