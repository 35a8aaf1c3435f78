//! Batch orchestrator: drives independent units of work.
//!
//! Work runs in two phases:
//!
//! 1. **Plan**, on the calling task: every output unit that already exists
//!    is put to the [`ConflictResolver`] one at a time. Replaced units are
//!    removed here, before any worker starts.
//! 2. **Run**: planned items are dispatched to a bounded pool of spawned
//!    tasks. A failing or panicking item is logged and marked failed; the
//!    rest of the batch carries on.
//!
//! Outcomes are returned in plan order regardless of completion order.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::conflict::{ConflictDecision, ConflictError, ConflictResolver};
use super::progress::Progress;

/// Items sharing one output unit
#[derive(Debug, Clone)]
pub struct UnitGroup<T> {
    /// Name used in logs
    pub label: String,
    /// Directory or file the group writes to
    pub output: PathBuf,
    pub items: Vec<T>,
}

impl<T> UnitGroup<T> {
    pub fn single(label: impl Into<String>, output: impl Into<PathBuf>, item: T) -> Self {
        Self {
            label: label.into(),
            output: output.into(),
            items: vec![item],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Disposition {
    Run,
    Skip,
    Blocked(String),
}

/// One item after conflict resolution
#[derive(Debug)]
pub struct PlannedUnit<T> {
    label: String,
    item: T,
    disposition: Disposition,
}

impl<T> PlannedUnit<T> {
    /// A unit with no output of its own to conflict with
    pub fn ready(label: impl Into<String>, item: T) -> Self {
        Self {
            label: label.into(),
            item,
            disposition: Disposition::Run,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.disposition == Disposition::Skip
    }
}

/// Result of one item
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome<R> {
    Done(R),
    Skipped,
    Failed(String),
}

impl<R> UnitOutcome<R> {
    pub fn done(&self) -> Option<&R> {
        match self {
            Self::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// Outcomes of a batch, in plan order
#[derive(Debug)]
pub struct BatchReport<R> {
    pub run_id: Uuid,
    pub outcomes: Vec<UnitOutcome<R>>,
}

impl<R> BatchReport<R> {
    pub fn done(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, UnitOutcome::Done(_))).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, UnitOutcome::Skipped)).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, UnitOutcome::Failed(_))).count()
    }
}

/// Runs units through a bounded worker pool
#[derive(Debug, Clone, Copy)]
pub struct BatchOrchestrator {
    jobs: usize,
}

impl Default for BatchOrchestrator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl BatchOrchestrator {
    /// Pool of `jobs` workers; zero is treated as one
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }

    /// Resolve conflicts for every group, sequentially
    ///
    /// Only prompt failures abort planning. A unit that cannot be removed
    /// for replacement is planned as failed.
    pub async fn plan<T>(
        &self,
        groups: Vec<UnitGroup<T>>,
        resolver: &dyn ConflictResolver,
    ) -> Result<Vec<PlannedUnit<T>>, ConflictError> {
        let mut planned = Vec::new();

        for group in groups {
            let disposition = if group.output.exists() {
                match resolver.decide(&group.output)? {
                    ConflictDecision::Skip => {
                        info!(unit = %group.label, "Output exists, skipping");
                        Disposition::Skip
                    }
                    ConflictDecision::Replace => match remove_output(&group.output).await {
                        Ok(()) => Disposition::Run,
                        Err(e) => {
                            warn!(
                                unit = %group.label,
                                path = %group.output.display(),
                                error = %e,
                                "Failed to remove existing output"
                            );
                            Disposition::Blocked(format!(
                                "failed to remove {}: {}",
                                group.output.display(),
                                e
                            ))
                        }
                    },
                }
            } else {
                Disposition::Run
            };

            for item in group.items {
                planned.push(PlannedUnit {
                    label: group.label.clone(),
                    item,
                    disposition: disposition.clone(),
                });
            }
        }

        Ok(planned)
    }

    /// Execute planned units, at most `jobs` at a time
    pub async fn run<T, R, F, Fut>(
        &self,
        planned: Vec<PlannedUnit<T>>,
        progress: Arc<Progress>,
        work: F,
    ) -> BatchReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("batch", %run_id, jobs = self.jobs, units = planned.len());

        let mut outcomes: Vec<(usize, UnitOutcome<R>)> = stream::iter(planned.into_iter().enumerate())
            .map(|(index, unit)| {
                let progress = Arc::clone(&progress);
                let label = unit.label;
                let task = match unit.disposition {
                    Disposition::Run => Ok(Some(tokio::spawn(work(unit.item).in_current_span()))),
                    Disposition::Skip => Ok(None),
                    Disposition::Blocked(reason) => Err(reason),
                };

                async move {
                    let outcome = match task {
                        Ok(None) => {
                            progress.advance(1);
                            UnitOutcome::Skipped
                        }
                        Err(reason) => {
                            progress.advance_failed();
                            UnitOutcome::Failed(reason)
                        }
                        Ok(Some(handle)) => match handle.await {
                            Ok(Ok(value)) => {
                                progress.advance(1);
                                UnitOutcome::Done(value)
                            }
                            Ok(Err(e)) => {
                                let reason = format!("{:#}", e);
                                warn!(unit = %label, error = %reason, "Unit failed");
                                progress.advance_failed();
                                UnitOutcome::Failed(reason)
                            }
                            Err(e) => {
                                error!(unit = %label, error = %e, "Unit aborted");
                                progress.advance_failed();
                                UnitOutcome::Failed(e.to_string())
                            }
                        },
                    };
                    (index, outcome)
                }
            })
            .buffer_unordered(self.jobs)
            .collect()
            .instrument(span.clone())
            .await;

        outcomes.sort_by_key(|(index, _)| *index);
        let report = BatchReport {
            run_id,
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        span.in_scope(|| {
            info!(
                done = report.done(),
                skipped = report.skipped(),
                failed = report.failed(),
                "Batch finished"
            )
        });
        report
    }
}

async fn remove_output(path: &std::path::Path) -> std::io::Result<()> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conflict::FixedResolver;
    use tempfile::TempDir;

    fn groups(root: &std::path::Path, n: usize) -> Vec<UnitGroup<usize>> {
        (0..n)
            .map(|i| UnitGroup::single(format!("unit-{}", i), root.join(format!("unit-{}", i)), i))
            .collect()
    }

    #[tokio::test]
    async fn test_outcomes_in_plan_order() {
        let temp = TempDir::new().unwrap();
        let orchestrator = BatchOrchestrator::new(4);
        let resolver = FixedResolver(ConflictDecision::Replace);

        let planned = orchestrator.plan(groups(temp.path(), 8), &resolver).await.unwrap();
        let progress = Arc::new(Progress::hidden());
        let report = orchestrator
            .run(planned, Arc::clone(&progress), |i: usize| async move {
                // Later units finish first
                tokio::time::sleep(std::time::Duration::from_millis((8 - i as u64) * 5)).await;
                anyhow::Ok(i * 10)
            })
            .await;

        let values: Vec<usize> = report.outcomes.iter().filter_map(|o| o.done().copied()).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40, 50, 60, 70]);
        assert_eq!(progress.completed(), 8);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let temp = TempDir::new().unwrap();
        let orchestrator = BatchOrchestrator::new(2);
        let resolver = FixedResolver(ConflictDecision::Replace);

        let planned = orchestrator.plan(groups(temp.path(), 4), &resolver).await.unwrap();
        let progress = Arc::new(Progress::hidden());
        let report = orchestrator
            .run(planned, Arc::clone(&progress), |i: usize| async move {
                match i {
                    1 => anyhow::bail!("unit {} broke", i),
                    2 => panic!("unit {} panicked", i),
                    _ => anyhow::Ok(i),
                }
            })
            .await;

        assert_eq!(report.done(), 2);
        assert_eq!(report.failed(), 2);
        assert!(matches!(&report.outcomes[1], UnitOutcome::Failed(r) if r.contains("broke")));
        assert_eq!(progress.completed(), 4);
        assert_eq!(progress.failed(), 2);
    }

    #[tokio::test]
    async fn test_skip_existing_does_no_work() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("unit-0")).unwrap();
        std::fs::write(temp.path().join("unit-0").join("keep.txt"), "x").unwrap();

        let orchestrator = BatchOrchestrator::new(1);
        let resolver = FixedResolver(ConflictDecision::Skip);
        let planned = orchestrator.plan(groups(temp.path(), 2), &resolver).await.unwrap();
        assert!(planned[0].is_skipped());
        assert!(!planned[1].is_skipped());

        let progress = Arc::new(Progress::hidden());
        let report = orchestrator
            .run(planned, Arc::clone(&progress), |i: usize| async move { anyhow::Ok(i) })
            .await;

        assert_eq!(report.outcomes[0], UnitOutcome::Skipped);
        assert_eq!(report.outcomes[1], UnitOutcome::Done(1));
        assert_eq!(progress.completed(), 2);
        assert!(temp.path().join("unit-0").join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_replace_removes_existing_output() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("unit-0");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("stale.txt"), "x").unwrap();
        let file = temp.path().join("unit-1");
        std::fs::write(&file, "old").unwrap();

        let orchestrator = BatchOrchestrator::default();
        let resolver = FixedResolver(ConflictDecision::Replace);
        let planned = orchestrator.plan(groups(temp.path(), 2), &resolver).await.unwrap();

        assert!(!dir.exists());
        assert!(!file.exists());
        assert!(planned.iter().all(|p| !p.is_skipped()));
    }

    #[tokio::test]
    async fn test_group_skip_covers_every_item() {
        let temp = TempDir::new().unwrap();
        let lang = temp.path().join("de");
        std::fs::create_dir(&lang).unwrap();

        let orchestrator = BatchOrchestrator::new(3);
        let resolver = FixedResolver(ConflictDecision::Skip);
        let group = UnitGroup {
            label: "de".to_string(),
            output: lang,
            items: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        let planned = orchestrator.plan(vec![group], &resolver).await.unwrap();
        assert_eq!(planned.len(), 3);

        let progress = Arc::new(Progress::hidden());
        let report = orchestrator
            .run(planned, Arc::clone(&progress), |_: String| async move {
                Err::<(), _>(anyhow::anyhow!("should not run"))
            })
            .await;
        assert_eq!(report.skipped(), 3);
        assert_eq!(progress.completed(), 3);
    }
}
