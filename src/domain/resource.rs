//! Resource cells and their local mirrors.
//!
//! A catalog cell holds zero, one, or many remote links. The ledger keeps a
//! value of the same shape for every cell, with local file names in place of
//! URLs and `None` wherever a download failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a cell does not have a shape we can work with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error("multiple-link cell holds {0} link(s); expected at least two")]
    UndersizedMultiple(usize),

    #[error("link is empty")]
    EmptyLink,

    #[error("cannot decode cell text '{text}': {reason}")]
    Undecodable { text: String, reason: String },

    #[error("ledger value has shape {ledger} but catalog cell has shape {catalog}")]
    ShapeMismatch {
        catalog: &'static str,
        ledger: &'static str,
    },
}

/// Remote links of one resource slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "links", rename_all = "snake_case")]
pub enum ResourceCell {
    /// No link in the cell
    Absent,

    /// Exactly one link
    Single(String),

    /// Two or more links, in document order
    Multiple(Vec<String>),
}

/// Classify the links discovered in a cell: zero, one, or more.
pub fn resolve<I, S>(links: I) -> ResourceCell
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut links: Vec<String> = links.into_iter().map(Into::into).collect();
    match links.len() {
        0 => ResourceCell::Absent,
        1 => ResourceCell::Single(links.remove(0)),
        _ => ResourceCell::Multiple(links),
    }
}

impl ResourceCell {
    /// Name of the variant, used in diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Single(_) => "single",
            Self::Multiple(_) => "multiple",
        }
    }

    /// All links in the cell, in order
    pub fn links(&self) -> Vec<&str> {
        match self {
            Self::Absent => Vec::new(),
            Self::Single(url) => vec![url.as_str()],
            Self::Multiple(urls) => urls.iter().map(String::as_str).collect(),
        }
    }

    /// Check that the cell is one `resolve` could have produced
    pub fn validate(&self) -> Result<(), CellError> {
        match self {
            Self::Absent => Ok(()),
            Self::Single(url) if url.trim().is_empty() => Err(CellError::EmptyLink),
            Self::Single(_) => Ok(()),
            Self::Multiple(urls) if urls.len() < 2 => {
                Err(CellError::UndersizedMultiple(urls.len()))
            }
            Self::Multiple(urls) if urls.iter().any(|u| u.trim().is_empty()) => {
                Err(CellError::EmptyLink)
            }
            Self::Multiple(_) => Ok(()),
        }
    }

    /// Encode for a table cell: empty, the bare link, or a JSON array
    pub fn to_cell_text(&self) -> String {
        match self {
            Self::Absent => String::new(),
            Self::Single(url) => url.clone(),
            // A Vec<String> always serializes
            Self::Multiple(urls) => serde_json::to_string(urls).unwrap_or_default(),
        }
    }

    /// Decode the text produced by [`ResourceCell::to_cell_text`]
    pub fn from_cell_text(text: &str) -> Result<Self, CellError> {
        if text.is_empty() {
            return Ok(Self::Absent);
        }
        if !text.starts_with('[') {
            return Ok(Self::Single(text.to_string()));
        }

        let urls: Vec<String> =
            serde_json::from_str(text).map_err(|e| CellError::Undecodable {
                text: text.to_string(),
                reason: e.to_string(),
            })?;
        let cell = resolve(urls);
        if !matches!(cell, Self::Multiple(_)) {
            return Err(CellError::Undecodable {
                text: text.to_string(),
                reason: "list cell must hold at least two links".to_string(),
            });
        }
        Ok(cell)
    }
}

/// Local outcome of one resource slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "files", rename_all = "snake_case")]
pub enum LocalValue {
    /// The catalog cell had no link
    Absent,

    /// File name of the single download, `None` if it failed
    Single(Option<String>),

    /// File names of each download, `None` in failed positions
    Multiple(Vec<Option<String>>),
}

impl LocalValue {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Single(_) => "single",
            Self::Multiple(_) => "multiple",
        }
    }

    /// Same variant as the catalog cell and, for lists, the same length
    pub fn matches_shape(&self, cell: &ResourceCell) -> bool {
        match (self, cell) {
            (Self::Absent, ResourceCell::Absent) => true,
            (Self::Single(_), ResourceCell::Single(_)) => true,
            (Self::Multiple(files), ResourceCell::Multiple(urls)) => files.len() == urls.len(),
            _ => false,
        }
    }

    /// Number of positions that failed to download
    pub fn failures(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Single(file) => usize::from(file.is_none()),
            Self::Multiple(files) => files.iter().filter(|f| f.is_none()).count(),
        }
    }

    /// The single present file, if this is a successful single download
    pub fn single_file(&self) -> Option<&str> {
        match self {
            Self::Single(Some(file)) => Some(file.as_str()),
            _ => None,
        }
    }

    pub fn to_cell_text(&self) -> String {
        match self {
            Self::Absent | Self::Single(None) => String::new(),
            Self::Single(Some(file)) => file.clone(),
            Self::Multiple(files) => serde_json::to_string(files).unwrap_or_default(),
        }
    }

    /// Decode a ledger cell using the shape of the catalog cell in the same row
    pub fn from_cell_text(text: &str, cell: &ResourceCell) -> Result<Self, CellError> {
        let value = match cell {
            ResourceCell::Absent if text.is_empty() => Self::Absent,
            ResourceCell::Absent => {
                return Err(CellError::ShapeMismatch {
                    catalog: cell.shape(),
                    ledger: "single",
                })
            }
            ResourceCell::Single(_) if text.is_empty() => Self::Single(None),
            ResourceCell::Single(_) => Self::Single(Some(text.to_string())),
            ResourceCell::Multiple(_) => {
                let files: Vec<Option<String>> =
                    serde_json::from_str(text).map_err(|e| CellError::Undecodable {
                        text: text.to_string(),
                        reason: e.to_string(),
                    })?;
                Self::Multiple(files)
            }
        };

        if !value.matches_shape(cell) {
            return Err(CellError::ShapeMismatch {
                catalog: cell.shape(),
                ledger: value.shape(),
            });
        }
        Ok(value)
    }
}
