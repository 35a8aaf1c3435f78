//! Command-line interface for signcorpus.
//!
//! Provides commands for acquiring and analyzing the DGS Korpus,
//! downloading hosted sign language videos, rendering pose files,
//! and showing the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::adapters::{CommandRenderer, FfprobeProber, HttpFetcher, TrustPolicy, YtDlp};
use crate::catalog::AllowList;
use crate::config::{self, ResolvedConfig};
use crate::core::{
    resolver_for, BatchReport, ConflictPolicy, PromptResolver, RetryPolicy, UnitOutcome,
};
use crate::pipelines::{
    KorpusOptions, KorpusPipeline, PosesOptions, PosesPipeline, RunMode, VideosOptions,
    VideosPipeline,
};

/// signcorpus - Sign language corpus acquisition
#[derive(Parser, Debug)]
#[command(name = "signcorpus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every pipeline; override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output root directory
    #[arg(short, long, global = true, env = "SIGNCORPUS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long, global = true, env = "SIGNCORPUS_JOBS")]
    pub jobs: Option<usize>,

    /// What to do with existing output
    #[arg(long, global = true, value_enum)]
    pub conflict: Option<ConflictPolicy>,

    /// Certificate checks: "default", "disabled", or a PEM certificate path
    #[arg(long, global = true)]
    pub trust: Option<TrustPolicy>,

    /// Download attempts per resource
    #[arg(long, global = true)]
    pub retries: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and analyze the DGS Korpus
    Korpus {
        /// Acquire, analyze, or both
        #[arg(short, long, value_enum, default_value = "both")]
        action: RunMode,

        /// URL of the index page
        #[arg(long)]
        index_url: Option<String>,

        /// Prefix for resource links
        #[arg(long)]
        download_base: Option<String>,

        /// Ledger table path (defaults to <output>/dgs_korpus_paths.csv)
        #[arg(long)]
        ledger_path: Option<PathBuf>,

        /// Only entries whose age group matches one of these patterns
        #[arg(long, num_args = 1..)]
        age_groups: Vec<String>,
    },

    /// Download hosted videos listed by id and language
    Videos {
        /// Listing path or URL (video_id,language per line)
        listing: Option<String>,

        /// Only these languages (glob patterns)
        #[arg(short, long, num_args = 1..)]
        languages: Vec<String>,
    },

    /// Render pose files to videos
    Poses {
        /// Pose file or directory searched recursively
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show resolved configuration
    Config,
}

/// Configuration with command-line overrides applied
struct Settings {
    jobs: usize,
    conflict: ConflictPolicy,
    trust: TrustPolicy,
    retry: RetryPolicy,
}

impl Settings {
    fn resolve(options: &GlobalOptions, cfg: &ResolvedConfig) -> Result<Self> {
        let jobs = options.jobs.unwrap_or(cfg.jobs);
        if jobs == 0 {
            anyhow::bail!("--jobs must be at least 1");
        }

        let mut retry = cfg.retry.clone();
        if let Some(attempts) = options.retries {
            retry.max_attempts = attempts;
        }
        retry.validate()?;

        Ok(Self {
            jobs,
            conflict: options.conflict.unwrap_or(cfg.conflict),
            trust: options.trust.clone().unwrap_or_else(|| cfg.trust.clone()),
            retry,
        })
    }

    fn fetcher(&self, cfg: &ResolvedConfig) -> Result<Arc<HttpFetcher>> {
        let fetcher = HttpFetcher::new(&self.trust, cfg.timeout).context("Failed to set up HTTP client")?;
        Ok(Arc::new(fetcher))
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;
        let settings = Settings::resolve(&self.options, cfg)?;

        match self.command {
            Commands::Korpus {
                action,
                index_url,
                download_base,
                ledger_path,
                age_groups,
            } => {
                run_korpus(
                    &self.options,
                    cfg,
                    &settings,
                    action,
                    index_url,
                    download_base,
                    ledger_path,
                    age_groups,
                )
                .await
            }
            Commands::Videos { listing, languages } => {
                run_videos(&self.options, cfg, &settings, listing, languages).await
            }
            Commands::Poses { input } => run_poses(&self.options, cfg, &settings, input).await,
            Commands::Config => {
                show_config(&self.options, cfg, &settings);
                Ok(())
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_korpus(
    options: &GlobalOptions,
    cfg: &ResolvedConfig,
    settings: &Settings,
    action: RunMode,
    index_url: Option<String>,
    download_base: Option<String>,
    ledger_path: Option<PathBuf>,
    age_groups: Vec<String>,
) -> Result<()> {
    let root = options.output.clone().unwrap_or_else(|| cfg.korpus.output.clone());
    let age_groups = if age_groups.is_empty() {
        cfg.korpus.age_groups.clone()
    } else {
        age_groups
    };

    let korpus_options = KorpusOptions {
        index_url: index_url.unwrap_or_else(|| cfg.korpus.index_url.clone()),
        download_base: download_base.unwrap_or_else(|| cfg.korpus.download_base.clone()),
        ledger_path: ledger_path.unwrap_or_else(|| root.join(&cfg.korpus.ledger_file)),
        metadata_path: root.join(&cfg.korpus.metadata_file),
        conflict: settings.conflict,
        age_groups: AllowList::new(&age_groups)?,
        jobs: settings.jobs,
        retry: settings.retry.clone(),
        root,
    };

    let pipeline = KorpusPipeline::new(
        settings.fetcher(cfg)?,
        Arc::new(FfprobeProber::with_binary_path(&cfg.tools.ffprobe)),
        Arc::new(PromptResolver::terminal()),
        korpus_options,
    );

    if action.acquires() {
        let table = pipeline.acquire().await?;
        let failures: usize = table
            .rows
            .iter()
            .filter_map(|r| r.ledger.as_ref())
            .map(|l| l.failures())
            .sum();
        println!("Ledger saved at {}", pipeline.options().ledger_path.display());
        println!(
            "Entries: {} ({} with paths), failed downloads: {}",
            table.len(),
            table.rows.iter().filter(|r| r.ledger.is_some()).count(),
            failures
        );
    }

    if action.analyzes() {
        match pipeline.analyze().await? {
            Some(summary) => {
                println!("Metadata saved at {}", summary.metadata_path.display());
                println!();
                match summary.stats {
                    Some(stats) => println!("{}", stats),
                    None => println!("No video durations available"),
                }
                println!();
                println!(
                    "Saved {} figures at {}",
                    summary.charts.len(),
                    pipeline.options().figures_dir().display()
                );
            }
            None => println!("Analysis skipped"),
        }
    }

    Ok(())
}

async fn run_videos(
    options: &GlobalOptions,
    cfg: &ResolvedConfig,
    settings: &Settings,
    listing: Option<String>,
    languages: Vec<String>,
) -> Result<()> {
    let languages = if languages.is_empty() {
        cfg.videos.languages.clone()
    } else {
        languages
    };

    let videos_options = VideosOptions {
        listing: listing.unwrap_or_else(|| cfg.videos.listing.clone()),
        output: options.output.clone().unwrap_or_else(|| cfg.videos.output.clone()),
        languages: AllowList::new(&languages)?,
        jobs: settings.jobs,
        retry: settings.retry.clone(),
    };

    let pipeline = VideosPipeline::new(
        settings.fetcher(cfg)?,
        Arc::new(YtDlp::with_binary_path(&cfg.tools.yt_dlp)),
        resolver_for(settings.conflict),
        videos_options,
    );

    let report = pipeline.run().await?;
    print_report("Videos", &report);
    Ok(())
}

async fn run_poses(
    options: &GlobalOptions,
    cfg: &ResolvedConfig,
    settings: &Settings,
    input: PathBuf,
) -> Result<()> {
    let output = options
        .output
        .clone()
        .context("--output is required for pose rendering")?;

    let pipeline = PosesPipeline::new(
        Arc::new(CommandRenderer::with_binary_path(&cfg.tools.visualize_pose)),
        resolver_for(settings.conflict),
        PosesOptions {
            input,
            output,
            jobs: settings.jobs,
        },
    );

    let report = pipeline.run().await?;
    print_report("Pose videos", &report);
    Ok(())
}

fn print_report(label: &str, report: &BatchReport<PathBuf>) {
    println!(
        "{}: {} done, {} skipped, {} failed",
        label,
        report.done(),
        report.skipped(),
        report.failed()
    );
    for outcome in &report.outcomes {
        if let UnitOutcome::Failed(reason) = outcome {
            eprintln!("  failed: {}", reason);
        }
    }
}

fn show_config(options: &GlobalOptions, cfg: &ResolvedConfig, settings: &Settings) {
    println!("signcorpus configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Run settings:");
    println!("  Jobs:      {}", settings.jobs);
    println!("  Conflict:  {:?}", settings.conflict);
    println!("  Trust:     {}", settings.trust);
    println!("  Attempts:  {}", settings.retry.max_attempts);
    println!("  Timeout:   {}s", cfg.timeout.as_secs());
    println!();
    println!("DGS Korpus:");
    println!(
        "  Output:    {}",
        options.output.as_ref().unwrap_or(&cfg.korpus.output).display()
    );
    println!("  Index:     {}", cfg.korpus.index_url);
    println!("  Downloads: {}", cfg.korpus.download_base);
    println!("  Ledger:    {}", cfg.korpus.ledger_file);
    println!("  Metadata:  {}", cfg.korpus.metadata_file);
    if !cfg.korpus.age_groups.is_empty() {
        println!("  Age groups: {}", cfg.korpus.age_groups.join(", "));
    }
    println!();
    println!("Videos:");
    println!(
        "  Output:    {}",
        options.output.as_ref().unwrap_or(&cfg.videos.output).display()
    );
    println!("  Listing:   {}", cfg.videos.listing);
    if !cfg.videos.languages.is_empty() {
        println!("  Languages: {}", cfg.videos.languages.join(", "));
    }
    println!();
    println!("Tools:");
    println!("  ffprobe:        {}", cfg.tools.ffprobe);
    println!("  yt-dlp:         {}", cfg.tools.yt_dlp);
    println!("  visualize_pose: {}", cfg.tools.visualize_pose);
}
