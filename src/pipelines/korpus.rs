//! DGS Korpus pipeline: acquire the corpus, then analyze it.
//!
//! Acquisition builds the catalog from the index page, downloads every
//! entry into `<root>/<id>/` and writes the ledger table. Analysis probes
//! the downloaded videos, writes the metadata table, and produces duration
//! statistics and chart series under `<root>/_figures`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::adapters::{ChartRenderer, Fetcher, JsonChartWriter, MediaProber};
use crate::catalog::{fetch_catalog, AllowList};
use crate::core::{
    AcquisitionEngine, BatchOrchestrator, ConflictDecision, ConflictError, ConflictPolicy,
    ConflictResolver, FixedResolver, PlannedUnit, Progress, RetryPolicy, UnitGroup, UnitOutcome,
};
use crate::domain::{entry_dir, CatalogEntry, CatalogSchema, DatasetTable, LedgerEntry};
use crate::metadata::MetadataExtractor;
use crate::report::{build_charts, DurationStats};

pub const FIGURES_DIR: &str = "_figures";

const AGE_GROUP: &str = "Age Group";

/// What a korpus run does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "lower")]
pub enum RunMode {
    /// Download the corpus and write the ledger table
    Acquire,
    /// Probe downloaded videos and report on them
    Analyze,
    /// Acquire, then analyze
    Both,
}

impl RunMode {
    pub fn acquires(self) -> bool {
        matches!(self, Self::Acquire | Self::Both)
    }

    pub fn analyzes(self) -> bool {
        matches!(self, Self::Analyze | Self::Both)
    }
}

#[derive(Debug, Clone)]
pub struct KorpusOptions {
    /// Output root holding one directory per entry
    pub root: PathBuf,
    pub index_url: String,
    /// Prefix for relative resource links
    pub download_base: String,
    pub ledger_path: PathBuf,
    pub metadata_path: PathBuf,
    pub conflict: ConflictPolicy,
    /// Patterns matched against the Age Group attribute
    pub age_groups: AllowList,
    pub jobs: usize,
    pub retry: RetryPolicy,
}

impl KorpusOptions {
    pub fn figures_dir(&self) -> PathBuf {
        self.root.join(FIGURES_DIR)
    }
}

/// Result of the analysis step
#[derive(Debug)]
pub struct AnalysisSummary {
    pub stats: Option<DurationStats>,
    pub charts: Vec<PathBuf>,
    pub metadata_path: PathBuf,
}

pub struct KorpusPipeline {
    fetcher: Arc<dyn Fetcher>,
    prober: Arc<dyn MediaProber>,
    /// Consulted only under [`ConflictPolicy::Ask`]
    prompt: Arc<dyn ConflictResolver>,
    schema: CatalogSchema,
    options: KorpusOptions,
}

impl KorpusPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        prober: Arc<dyn MediaProber>,
        prompt: Arc<dyn ConflictResolver>,
        options: KorpusOptions,
    ) -> Self {
        Self {
            fetcher,
            prober,
            prompt,
            schema: CatalogSchema::dgs_korpus(),
            options,
        }
    }

    pub fn options(&self) -> &KorpusOptions {
        &self.options
    }

    /// Decision applied to existing entry directories.
    ///
    /// Under `ask` the whole root is confirmed once; declining aborts.
    fn root_decision(&self) -> Result<ConflictDecision, ConflictError> {
        let root = &self.options.root;
        match self.options.conflict {
            ConflictPolicy::Replace => Ok(ConflictDecision::Replace),
            ConflictPolicy::Skip => Ok(ConflictDecision::Skip),
            ConflictPolicy::Ask if !root.exists() => Ok(ConflictDecision::Replace),
            ConflictPolicy::Ask => match self.prompt.decide(root)? {
                ConflictDecision::Replace => Ok(ConflictDecision::Replace),
                ConflictDecision::Skip => Err(ConflictError::Declined(root.display().to_string())),
            },
        }
    }

    /// Ledger table of an earlier run, if one can be read
    fn previous_ledger(&self) -> Option<DatasetTable> {
        let path = &self.options.ledger_path;
        if !path.exists() {
            return None;
        }
        match DatasetTable::load(path, &self.schema) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Previous ledger unreadable, skipped entries get no paths");
                None
            }
        }
    }

    /// Download every catalog entry and persist the ledger table
    #[instrument(skip(self), fields(root = %self.options.root.display()))]
    pub async fn acquire(&self) -> Result<DatasetTable> {
        let decision = self.root_decision()?;
        let previous = match decision {
            ConflictDecision::Skip => self.previous_ledger(),
            ConflictDecision::Replace => None,
        };

        let entries = fetch_catalog(
            self.fetcher.as_ref(),
            &self.options.index_url,
            &self.options.download_base,
            &self.schema,
        )
        .await
        .context("Failed to build catalog")?;

        let entries: Vec<CatalogEntry> = entries
            .into_iter()
            .filter(|e| self.options.age_groups.allows(e.attribute(AGE_GROUP).unwrap_or_default()))
            .collect();
        info!(entries = entries.len(), "Acquiring catalog entries");

        let root = self.options.root.clone();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create output root: {}", root.display()))?;

        let orchestrator = BatchOrchestrator::new(self.options.jobs);
        let groups = entries
            .iter()
            .map(|e| {
                let dir = entry_dir(&root, &e.id)
                    .with_context(|| format!("Entry id '{}' is not a plain directory name", e.id))?;
                anyhow::Ok(UnitGroup::single(e.id.clone(), dir, e.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let planned = orchestrator.plan(groups, &FixedResolver(decision)).await?;

        let progress = Arc::new(Progress::new("Downloading DGS Korpus", planned.len() as u64));
        let engine = Arc::new(AcquisitionEngine::new(
            Arc::clone(&self.fetcher),
            self.options.retry.clone(),
        ));
        let report = orchestrator
            .run(planned, Arc::clone(&progress), move |entry: CatalogEntry| {
                let engine = Arc::clone(&engine);
                let root = root.clone();
                async move { anyhow::Ok(engine.acquire(&entry, &root).await?) }
            })
            .await;
        progress.finish();

        let mut table = DatasetTable::new(self.schema.clone(), entries);
        let ids: Vec<String> = table.rows.iter().map(|r| r.entry.id.clone()).collect();
        for (id, outcome) in ids.iter().zip(report.outcomes) {
            match outcome {
                UnitOutcome::Done(ledger) => table.set_ledger(ledger)?,
                UnitOutcome::Skipped => {
                    let carried = previous
                        .as_ref()
                        .and_then(|p| p.row(id))
                        .and_then(|r| r.ledger.clone());
                    match carried {
                        Some(ledger) => {
                            if let Err(e) = table.set_ledger(ledger) {
                                warn!(entry = %id, error = %e, "Previous ledger entry no longer fits the catalog");
                            }
                        }
                        None => warn!(entry = %id, "Skipped entry has no previous ledger entry"),
                    }
                }
                UnitOutcome::Failed(_) => {}
            }
        }

        table
            .save(&self.options.ledger_path)
            .with_context(|| format!("Failed to write ledger: {}", self.options.ledger_path.display()))?;
        info!(
            path = %self.options.ledger_path.display(),
            acquired = acquired_count(&table),
            "Ledger saved"
        );
        Ok(table)
    }

    /// Probe videos listed in the ledger, then report.
    ///
    /// Returns `None` when the figures directory exists and is kept.
    #[instrument(skip(self), fields(root = %self.options.root.display()))]
    pub async fn analyze(&self) -> Result<Option<AnalysisSummary>> {
        let figures = self.options.figures_dir();
        if figures.exists() {
            let decision = match self.options.conflict {
                ConflictPolicy::Replace => ConflictDecision::Replace,
                ConflictPolicy::Skip => ConflictDecision::Skip,
                ConflictPolicy::Ask => self.prompt.decide(&figures)?,
            };
            if decision == ConflictDecision::Skip {
                warn!(path = %figures.display(), "Figures directory kept, analysis skipped");
                return Ok(None);
            }
            fs::remove_dir_all(&figures)
                .await
                .with_context(|| format!("Failed to remove {}", figures.display()))?;
        }
        fs::create_dir_all(&figures)
            .await
            .with_context(|| format!("Failed to create {}", figures.display()))?;

        let mut table = DatasetTable::load(&self.options.ledger_path, &self.schema)
            .with_context(|| format!("Failed to read ledger: {}", self.options.ledger_path.display()))?;

        let planned: Vec<PlannedUnit<LedgerEntry>> = table
            .rows
            .iter()
            .filter_map(|r| r.ledger.clone())
            .map(|ledger| PlannedUnit::ready(ledger.id.clone(), ledger))
            .collect();

        let progress = Arc::new(Progress::new("Extracting metadata", planned.len() as u64));
        let extractor = MetadataExtractor::new(Arc::clone(&self.prober));
        let report = BatchOrchestrator::new(self.options.jobs)
            .run(planned, Arc::clone(&progress), move |ledger: LedgerEntry| {
                let extractor = extractor.clone();
                async move { anyhow::Ok(extractor.extract(&ledger).await) }
            })
            .await;
        progress.finish();

        table.reset_metadata();
        for outcome in report.outcomes {
            if let UnitOutcome::Done(record) = outcome {
                table.set_metadata(record)?;
            }
        }

        table
            .save(&self.options.metadata_path)
            .with_context(|| format!("Failed to write metadata: {}", self.options.metadata_path.display()))?;
        info!(path = %self.options.metadata_path.display(), "Metadata saved");

        let stats = DurationStats::for_table(&table);
        let writer = JsonChartWriter::new(&figures);
        let charts = render_charts(&table, &writer)?;
        info!(charts = charts.len(), dir = %figures.display(), "Charts written");

        Ok(Some(AnalysisSummary {
            stats,
            charts,
            metadata_path: self.options.metadata_path.clone(),
        }))
    }
}

fn acquired_count(table: &DatasetTable) -> usize {
    table.rows.iter().filter(|r| r.ledger.is_some()).count()
}

/// Hand every chart of the table to a renderer
pub fn render_charts(table: &DatasetTable, renderer: &dyn ChartRenderer) -> Result<Vec<PathBuf>> {
    build_charts(table)
        .iter()
        .map(|chart| {
            renderer
                .render(chart)
                .with_context(|| format!("Failed to render chart {}", chart.name))
        })
        .collect()
}
