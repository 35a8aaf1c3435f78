//! signcorpus - Sign language corpus acquisition
//!
//! Downloads sign-language video corpora into a local directory tree and
//! records what was fetched in a ledger table that mirrors the catalog.
//!
//! # Architecture
//!
//! Every run is a batch of independent output units:
//! - A catalog (HTML index or CSV listing) describes what exists remotely
//! - Existing output is resolved (replace / skip / ask) before any work starts
//! - Units are processed by a bounded worker pool; one failure never stops the batch
//! - Results are collected in catalog order, so the ledger is deterministic
//!
//! # Modules
//!
//! - `adapters`: External systems (HTTP, ffprobe, yt-dlp, pose renderer, charts)
//! - `catalog`: Index page parsing, listings, filters
//! - `core`: Acquisition engine, orchestrator, conflict resolution, retry, progress
//! - `domain`: Resource cells, catalog entries, the dataset table
//! - `metadata`: Video metadata extraction for acquired entries
//! - `pipelines`: The korpus, videos, and poses pipelines
//! - `report`: Duration statistics and chart series
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Download and analyze the DGS Korpus with 8 workers
//! signcorpus korpus -o ./dgs -j 8 --conflict skip
//!
//! # Download hosted videos for two languages
//! signcorpus videos listing.csv -o ./videos --languages de ase
//!
//! # Render pose files
//! signcorpus poses -i ./poses -o ./rendered
//! ```

pub mod adapters;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod metadata;
pub mod pipelines;
pub mod report;

// Re-export main types at crate root for convenience
pub use core::{AcquisitionEngine, BatchOrchestrator, ConflictPolicy, RetryPolicy};
pub use domain::{CatalogEntry, DatasetTable, LedgerEntry, LocalValue, ResourceCell};
pub use pipelines::{KorpusPipeline, PosesPipeline, VideosPipeline};
