//! Acquisition engine: materializes one catalog entry on local storage.
//!
//! Every linked resource is downloaded into `<root>/<entry id>/` under the
//! retry policy. Download failures never escape: a resource that fails on
//! every attempt becomes `None` in the ledger. Only structural problems with
//! the entry itself are returned as errors, before any network activity.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::adapters::Fetcher;
use crate::domain::{entry_dir, CatalogEntry, CellError, LedgerEntry, LocalValue, ResourceCell};

use super::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Entry '{entry}', slot '{slot}' is malformed: {source}")]
    Structural {
        entry: String,
        slot: String,
        #[source]
        source: CellError,
    },

    #[error("Entry id '{0}' is not a plain directory name")]
    UnsafeId(String),

    #[error("Entry '{entry}': link {url} has no file name")]
    NoFileName { entry: String, url: String },

    #[error("Failed to create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Local file name for a link: the last path segment, without query
pub fn file_name_of(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default();
    (!name.is_empty() && name != "." && name != "..").then(|| name.to_string())
}

/// Downloads the resources of catalog entries
pub struct AcquisitionEngine {
    fetcher: Arc<dyn Fetcher>,
    retry: RetryPolicy,
}

impl AcquisitionEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, retry: RetryPolicy) -> Self {
        Self { fetcher, retry }
    }

    /// Fetch every resource of `entry` into its directory under `root`
    #[instrument(skip(self, entry, root), fields(entry = %entry.id))]
    pub async fn acquire(&self, entry: &CatalogEntry, root: &Path) -> Result<LedgerEntry, AcquireError> {
        self.check_structure(entry)?;

        let base_dir = entry_dir(root, &entry.id).ok_or_else(|| AcquireError::UnsafeId(entry.id.clone()))?;
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|source| AcquireError::Directory {
                path: base_dir.clone(),
                source,
            })?;

        let mut files = Vec::with_capacity(entry.resources.len());
        for (slot, cell) in &entry.resources {
            let value = match cell {
                ResourceCell::Absent => LocalValue::Absent,
                ResourceCell::Single(url) => {
                    LocalValue::Single(self.fetch_with_retry(url, &base_dir).await)
                }
                ResourceCell::Multiple(urls) => {
                    let mut names = Vec::with_capacity(urls.len());
                    for url in urls {
                        names.push(self.fetch_with_retry(url, &base_dir).await);
                    }
                    let failed = names.iter().filter(|n| n.is_none()).count();
                    if failed > 0 {
                        warn!(
                            slot = %slot,
                            failed,
                            total = urls.len(),
                            urls = ?urls,
                            "Some links of the slot could not be downloaded"
                        );
                    }
                    LocalValue::Multiple(names)
                }
            };
            files.push((slot.clone(), value));
        }

        let ledger = LedgerEntry {
            id: entry.id.clone(),
            base_dir,
            files,
        };
        debug_assert!(ledger.matches_shape(entry));

        info!(failures = ledger.failures(), "Entry acquired");
        Ok(ledger)
    }

    /// Reject entries the engine cannot mirror faithfully
    fn check_structure(&self, entry: &CatalogEntry) -> Result<(), AcquireError> {
        for (slot, cell) in &entry.resources {
            cell.validate().map_err(|source| AcquireError::Structural {
                entry: entry.id.clone(),
                slot: slot.clone(),
                source,
            })?;
            for url in cell.links() {
                if file_name_of(url).is_none() {
                    return Err(AcquireError::NoFileName {
                        entry: entry.id.clone(),
                        url: url.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Download one link, returning its file name, or `None` once every
    /// attempt has failed
    pub async fn fetch_with_retry(&self, url: &str, dir: &Path) -> Option<String> {
        let file_name = file_name_of(url)?;
        let dest = dir.join(&file_name);

        match self.retry.run(url, || self.fetcher.download(url, &dest)).await {
            Ok(bytes) => {
                debug!(url, bytes, "Downloaded");
                Some(file_name)
            }
            Err(_) => None,
        }
    }
}
