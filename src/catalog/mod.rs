//! Catalog construction.
//!
//! - Builder: turns the HTML index into catalog entries
//! - Listing: reads a `video_id,language` listing
//! - Filter: glob allow-lists over groups or languages
//!
//! Every error here is fatal to the run: a partial catalog is never used.

pub mod builder;
pub mod filter;
pub mod listing;

use std::path::PathBuf;

use thiserror::Error;

use crate::adapters::FetchError;

pub use builder::{fetch_catalog, parse_index};
pub use filter::AllowList;
pub use listing::{group_by_language, load_listing, read_listing, ListingRow};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to fetch index: {0}")]
    Fetch(#[from] FetchError),

    #[error("Index contains no table")]
    MissingTable,

    #[error("Index table has no header row")]
    MissingHeader,

    #[error("Index header does not match the expected schema: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Index row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Invalid allow-list pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Failed to read listing {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Listing line {line} has {found} fields, expected at least 2")]
    ListingRow { line: u64, found: usize },
}
