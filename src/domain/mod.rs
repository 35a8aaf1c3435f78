//! Domain types for the acquisition ledger.
//!
//! This module contains the core data structures:
//! - Resource cells: absent, single, or multiple links per slot
//! - Entries: catalog entries, ledger entries, metadata records
//! - Table: the persisted dataset table

pub mod entry;
pub mod resource;
pub mod table;

// Re-export commonly used types
pub use entry::{
    assign_ids, entry_dir, role_path, CatalogEntry, CatalogSchema, LedgerEntry, MetadataRecord,
    VideoProbe, VideoRole,
};
pub use resource::{resolve, CellError, LocalValue, ResourceCell};
pub use table::{DatasetRow, DatasetTable, TableError};
