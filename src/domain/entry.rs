//! Catalog, ledger, and metadata records.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::resource::{LocalValue, ResourceCell};

/// Column names of a catalog index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSchema {
    /// Header of the title column, which becomes the row key
    pub title_column: String,

    /// Descriptive attribute columns, in index order
    pub attributes: Vec<String>,

    /// Attributes whose value is the cell's link texts rather than its text
    #[serde(default)]
    pub linked_attributes: Vec<String>,

    /// Resource slot columns, in index order
    pub slots: Vec<String>,
}

impl CatalogSchema {
    /// The DGS Korpus transcript index
    pub fn dgs_korpus() -> Self {
        Self {
            title_column: "Transcript".to_string(),
            attributes: ["Age Group", "Format", "Topics"]
                .map(String::from)
                .to_vec(),
            linked_attributes: vec!["Topics".to_string()],
            slots: [
                "iLex",
                "ELAN",
                "Video A",
                "Video B",
                "Video Total",
                "SRT",
                "Video AB",
                "CMDI",
                "OpenPose",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    pub fn is_linked(&self, attribute: &str) -> bool {
        self.linked_attributes.iter().any(|a| a == attribute)
    }

    /// Full header row as it appears in the index
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.title_column.clone())
            .chain(self.attributes.iter().cloned())
            .chain(self.slots.iter().cloned())
            .collect()
    }
}

/// One item of the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique key: `<title>__<ordinal>`
    pub id: String,

    /// Attribute values, keyed by column name, in schema order
    pub attributes: Vec<(String, String)>,

    /// Resource cells, keyed by slot name, in schema order
    pub resources: Vec<(String, ResourceCell)>,
}

impl CatalogEntry {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn resource(&self, slot: &str) -> Option<&ResourceCell> {
        self.resources
            .iter()
            .find(|(k, _)| k == slot)
            .map(|(_, v)| v)
    }
}

/// Derive unique identifiers from titles, in input order.
///
/// Every title gets a `__<n>` suffix where `n` counts earlier rows with the
/// same title, so two rows titled "X" become "X__0" and "X__1".
pub fn assign_ids<'a, I>(titles: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    titles
        .into_iter()
        .map(|title| {
            // Ids name directories, so separators cannot survive
            let key = title.replace(['/', '\\'], "_");
            let ordinal = seen.entry(key.clone()).or_insert(0);
            let id = format!("{}__{}", key, ordinal);
            *ordinal += 1;
            id
        })
        .collect()
}

/// Local acquisition outcome for one catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Same key as the catalog entry
    pub id: String,

    /// Directory holding the entry's downloads
    pub base_dir: PathBuf,

    /// One value per resource slot, in catalog order
    pub files: Vec<(String, LocalValue)>,
}

impl LedgerEntry {
    pub fn file(&self, slot: &str) -> Option<&LocalValue> {
        self.files.iter().find(|(k, _)| k == slot).map(|(_, v)| v)
    }

    /// Whether every slot has the variant and length of the catalog cell
    pub fn matches_shape(&self, entry: &CatalogEntry) -> bool {
        self.id == entry.id
            && self.files.len() == entry.resources.len()
            && self
                .files
                .iter()
                .zip(&entry.resources)
                .all(|((slot, value), (name, cell))| slot == name && value.matches_shape(cell))
    }

    /// Absolute path of a downloaded file
    pub fn local_path(&self, file: &str) -> PathBuf {
        self.base_dir.join(file)
    }

    /// Total number of failed downloads across slots
    pub fn failures(&self) -> usize {
        self.files.iter().map(|(_, v)| v.failures()).sum()
    }
}

/// Video slots whose metadata gets probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoRole {
    /// Primary signer view
    A,
    /// Secondary signer view
    B,
    /// Combined view of the whole session
    Total,
    /// Side-by-side view
    AB,
}

impl VideoRole {
    pub const ALL: [VideoRole; 4] = [Self::A, Self::B, Self::Total, Self::AB];

    /// Slot name in the catalog
    pub fn slot(self) -> &'static str {
        match self {
            Self::A => "Video A",
            Self::B => "Video B",
            Self::Total => "Video Total",
            Self::AB => "Video AB",
        }
    }
}

/// Intrinsic properties of a video asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoProbe {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Probed properties per video role; `None` when absent or unreadable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub videos: Vec<(VideoRole, Option<VideoProbe>)>,
}

impl MetadataRecord {
    /// A record with every role empty
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            videos: VideoRole::ALL.iter().map(|r| (*r, None)).collect(),
        }
    }

    pub fn video(&self, role: VideoRole) -> Option<&VideoProbe> {
        self.videos
            .iter()
            .find(|(r, _)| *r == role)
            .and_then(|(_, p)| p.as_ref())
    }
}

/// Path of a role's asset, if the ledger holds exactly one downloaded file
pub fn role_path(ledger: &LedgerEntry, role: VideoRole) -> Option<PathBuf> {
    ledger
        .file(role.slot())
        .and_then(LocalValue::single_file)
        .map(|f| ledger.local_path(f))
}

/// Directory of an entry under an output root, or `None` when the id is
/// not a single plain path component
pub fn entry_dir(root: &Path, id: &str) -> Option<PathBuf> {
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == id => Some(root.join(id)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_ids_disambiguates_in_order() {
        let ids = assign_ids(["X", "Y", "X", "X"]);
        assert_eq!(ids, vec!["X__0", "Y__0", "X__1", "X__2"]);
    }

    #[test]
    fn test_ids_stay_inside_the_root() {
        let ids = assign_ids(["../up", "/abs", "a\\b", "../up"]);
        assert_eq!(ids, vec![".._up__0", "_abs__0", "a_b__0", ".._up__1"]);

        let root = Path::new("/data/dgs");
        for id in &ids {
            assert_eq!(entry_dir(root, id), Some(root.join(id)));
        }
        assert_eq!(entry_dir(root, "../x"), None);
        assert_eq!(entry_dir(root, "/x"), None);
        assert_eq!(entry_dir(root, ".."), None);
        assert_eq!(entry_dir(root, ""), None);
    }

    #[test]
    fn test_schema_header_order() {
        let header = CatalogSchema::dgs_korpus().header();
        assert_eq!(header.len(), 13);
        assert_eq!(header[0], "Transcript");
        assert_eq!(header[4], "iLex");
        assert_eq!(header[12], "OpenPose");
    }

    #[test]
    fn test_ledger_shape_check() {
        let entry = CatalogEntry {
            id: "t__0".to_string(),
            attributes: vec![],
            resources: vec![
                ("iLex".to_string(), ResourceCell::Absent),
                (
                    "Video A".to_string(),
                    ResourceCell::Single("https://x/a.mp4".to_string()),
                ),
            ],
        };
        let mut ledger = LedgerEntry {
            id: "t__0".to_string(),
            base_dir: PathBuf::from("/data/t__0"),
            files: vec![
                ("iLex".to_string(), LocalValue::Absent),
                ("Video A".to_string(), LocalValue::Single(None)),
            ],
        };
        assert!(ledger.matches_shape(&entry));
        assert_eq!(ledger.failures(), 1);
        assert!(role_path(&ledger, VideoRole::A).is_none());

        ledger.files[1].1 = LocalValue::Single(Some("a.mp4".to_string()));
        assert_eq!(
            role_path(&ledger, VideoRole::A),
            Some(PathBuf::from("/data/t__0/a.mp4"))
        );

        ledger.files[0].1 = LocalValue::Multiple(vec![None, None]);
        assert!(!ledger.matches_shape(&entry));
    }
}
