//! Dataset table: catalog, ledger, and metadata in one delimited file.
//!
//! The file has two header rows. The first names the group of each column
//! (`Data`, `URLs`, `Paths`, `Metadata`), the second the field. Column 0 is
//! the entry identifier.
//!
//! ```text
//! ,Data,Data,...,URLs,...,Paths,Paths,...,Metadata,...
//! Transcript,Age Group,Format,...,iLex,...,base_dir,iLex,...,Video A Duration,...
//! 1413451-11105600-11163240__0,18-30,Interview,...
//! ```

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::entry::{CatalogEntry, CatalogSchema, LedgerEntry, MetadataRecord, VideoProbe, VideoRole};
use super::resource::{CellError, LocalValue, ResourceCell};

pub const GROUP_DATA: &str = "Data";
pub const GROUP_URLS: &str = "URLs";
pub const GROUP_PATHS: &str = "Paths";
pub const GROUP_METADATA: &str = "Metadata";

const BASE_DIR_FIELD: &str = "base_dir";

/// Errors reading or writing a dataset table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table header does not match the catalog schema: {0}")]
    Header(String),

    #[error("Row '{row}', column '{column}': {source}")]
    Cell {
        row: String,
        column: String,
        #[source]
        source: CellError,
    },

    #[error("Row '{row}', column '{column}': invalid number '{value}'")]
    Number {
        row: String,
        column: String,
        value: String,
    },

    #[error("Row '{row}' has {found} cells, expected {expected}")]
    RowWidth {
        row: String,
        found: usize,
        expected: usize,
    },

    #[error("Record '{0}' does not fit its catalog row")]
    Shape(String),
}

/// One row: catalog entry plus whatever was derived from it so far
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub entry: CatalogEntry,
    pub ledger: Option<LedgerEntry>,
    pub metadata: Option<MetadataRecord>,
}

impl DatasetRow {
    pub fn new(entry: CatalogEntry) -> Self {
        Self {
            entry,
            ledger: None,
            metadata: None,
        }
    }
}

/// The persisted union of catalog, ledger, and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetTable {
    pub schema: CatalogSchema,
    pub rows: Vec<DatasetRow>,
}

impl DatasetTable {
    pub fn new(schema: CatalogSchema, entries: Vec<CatalogEntry>) -> Self {
        Self {
            schema,
            rows: entries.into_iter().map(DatasetRow::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: &str) -> Option<&DatasetRow> {
        self.rows.iter().find(|r| r.entry.id == id)
    }

    fn has_ledger(&self) -> bool {
        self.rows.iter().any(|r| r.ledger.is_some())
    }

    fn has_metadata(&self) -> bool {
        self.rows.iter().any(|r| r.metadata.is_some())
    }

    /// Attach a ledger entry to its row, checking its shape
    pub fn set_ledger(&mut self, ledger: LedgerEntry) -> Result<(), TableError> {
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.entry.id == ledger.id)
            .ok_or_else(|| TableError::Shape(ledger.id.clone()))?;
        if !ledger.matches_shape(&row.entry) {
            return Err(TableError::Shape(ledger.id));
        }
        row.ledger = Some(ledger);
        Ok(())
    }

    /// Attach a metadata record to the row with the same key
    pub fn set_metadata(&mut self, record: MetadataRecord) -> Result<(), TableError> {
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.entry.id == record.id && r.ledger.is_some())
            .ok_or_else(|| TableError::Shape(record.id.clone()))?;
        row.metadata = Some(record);
        Ok(())
    }

    /// Give every acquired row an empty metadata record and clear the rest
    pub fn reset_metadata(&mut self) {
        for row in &mut self.rows {
            row.metadata = row
                .ledger
                .as_ref()
                .map(|_| MetadataRecord::empty(row.entry.id.clone()));
        }
    }

    fn columns(&self) -> Vec<(&'static str, String)> {
        let mut columns: Vec<(&'static str, String)> = Vec::new();
        columns.extend(self.schema.attributes.iter().map(|a| (GROUP_DATA, a.clone())));
        columns.extend(self.schema.slots.iter().map(|s| (GROUP_URLS, s.clone())));
        if self.has_ledger() {
            columns.push((GROUP_PATHS, BASE_DIR_FIELD.to_string()));
            columns.extend(self.schema.slots.iter().map(|s| (GROUP_PATHS, s.clone())));
        }
        if self.has_metadata() {
            columns.extend(metadata_fields().into_iter().map(|f| (GROUP_METADATA, f)));
        }
        columns
    }

    /// Serialize the table as CSV
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let with_ledger = self.has_ledger();
        let with_metadata = self.has_metadata();
        let columns = self.columns();

        let mut csv = csv::WriterBuilder::new().flexible(false).from_writer(writer);

        let groups = std::iter::once("").chain(columns.iter().map(|(g, _)| *g));
        csv.write_record(groups)?;
        let fields = std::iter::once(self.schema.title_column.as_str())
            .chain(columns.iter().map(|(_, f)| f.as_str()));
        csv.write_record(fields)?;

        for row in &self.rows {
            let mut record: Vec<String> = Vec::with_capacity(columns.len() + 1);
            record.push(row.entry.id.clone());
            record.extend(row.entry.attributes.iter().map(|(_, v)| v.clone()));
            record.extend(row.entry.resources.iter().map(|(_, c)| c.to_cell_text()));

            if with_ledger {
                match &row.ledger {
                    Some(ledger) => {
                        record.push(ledger.base_dir.to_string_lossy().into_owned());
                        record.extend(ledger.files.iter().map(|(_, v)| v.to_cell_text()));
                    }
                    None => {
                        record.extend(std::iter::repeat(String::new()).take(self.schema.slots.len() + 1))
                    }
                }
            }

            if with_metadata {
                let empty = MetadataRecord::empty(row.entry.id.clone());
                let metadata = row.metadata.as_ref().unwrap_or(&empty);
                for role in VideoRole::ALL {
                    match metadata.video(role) {
                        Some(probe) => {
                            record.push(probe.duration.to_string());
                            record.push(probe.width.to_string());
                            record.push(probe.height.to_string());
                        }
                        None => record.extend(std::iter::repeat(String::new()).take(3)),
                    }
                }
            }

            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Parse a table written by [`DatasetTable::write_to`]
    pub fn read_from<R: Read>(reader: R, schema: &CatalogSchema) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut records = csv.records();

        let groups = records
            .next()
            .ok_or_else(|| TableError::Header("missing group header row".to_string()))??;
        let fields = records
            .next()
            .ok_or_else(|| TableError::Header("missing field header row".to_string()))??;

        let header: Vec<(String, String)> = groups
            .iter()
            .zip(fields.iter())
            .skip(1)
            .map(|(g, f)| (g.to_string(), f.to_string()))
            .collect();
        if fields.get(0) != Some(schema.title_column.as_str()) {
            return Err(TableError::Header(format!(
                "first column is '{}', expected '{}'",
                fields.get(0).unwrap_or_default(),
                schema.title_column
            )));
        }

        let mut table = DatasetTable::new(schema.clone(), Vec::new());
        let data_urls = schema.attributes.len() + schema.slots.len();
        let mut expected: Vec<(&str, String)> = Vec::new();
        expected.extend(schema.attributes.iter().map(|a| (GROUP_DATA, a.clone())));
        expected.extend(schema.slots.iter().map(|s| (GROUP_URLS, s.clone())));

        let with_ledger = header.get(data_urls).map(|(g, _)| g.as_str()) == Some(GROUP_PATHS);
        if with_ledger {
            expected.push((GROUP_PATHS, BASE_DIR_FIELD.to_string()));
            expected.extend(schema.slots.iter().map(|s| (GROUP_PATHS, s.clone())));
        }
        let with_metadata = header.len() > expected.len();
        if with_metadata {
            expected.extend(metadata_fields().into_iter().map(|f| (GROUP_METADATA, f)));
        }

        let matches = header.len() == expected.len()
            && header
                .iter()
                .zip(&expected)
                .all(|((g, f), (eg, ef))| g == eg && f == ef);
        if !matches {
            return Err(TableError::Header(format!(
                "found {} columns that do not follow the expected layout",
                header.len()
            )));
        }

        for record in records {
            let record = record?;
            let id = record.get(0).unwrap_or_default().to_string();
            if record.len() != expected.len() + 1 {
                return Err(TableError::RowWidth {
                    row: id,
                    found: record.len(),
                    expected: expected.len() + 1,
                });
            }
            let cells: Vec<&str> = record.iter().skip(1).collect();
            let mut cursor = 0;

            let attributes = schema
                .attributes
                .iter()
                .map(|name| {
                    let value = cells[cursor].to_string();
                    cursor += 1;
                    (name.clone(), value)
                })
                .collect();

            let mut resources = Vec::with_capacity(schema.slots.len());
            for slot in &schema.slots {
                let cell = ResourceCell::from_cell_text(cells[cursor])
                    .map_err(|source| cell_error(&id, slot, source))?;
                resources.push((slot.clone(), cell));
                cursor += 1;
            }

            let entry = CatalogEntry {
                id: id.clone(),
                attributes,
                resources,
            };

            let ledger = if with_ledger {
                let base_dir = cells[cursor];
                cursor += 1;
                // An empty base_dir marks a row that was never acquired
                if base_dir.is_empty() {
                    cursor += schema.slots.len();
                    None
                } else {
                    let mut files = Vec::with_capacity(schema.slots.len());
                    for (slot, cell) in &entry.resources {
                        let value = LocalValue::from_cell_text(cells[cursor], cell)
                            .map_err(|source| cell_error(&id, slot, source))?;
                        files.push((slot.clone(), value));
                        cursor += 1;
                    }
                    Some(LedgerEntry {
                        id: id.clone(),
                        base_dir: PathBuf::from(base_dir),
                        files,
                    })
                }
            } else {
                None
            };

            // Only acquired rows carry metadata
            let metadata = if with_metadata {
                let mut videos = Vec::with_capacity(VideoRole::ALL.len());
                for role in VideoRole::ALL {
                    let probe = parse_probe(&id, role, &cells[cursor..cursor + 3])?;
                    videos.push((role, probe));
                    cursor += 3;
                }
                ledger.as_ref().map(|_| MetadataRecord {
                    id: id.clone(),
                    videos,
                })
            } else {
                None
            };

            table.rows.push(DatasetRow {
                entry,
                ledger,
                metadata,
            });
        }

        Ok(table)
    }

    /// Write the table to a file, replacing it atomically
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        self.write_to(&mut tmp)?;
        tmp.persist(path).map_err(|e| TableError::Io(e.error))?;
        Ok(())
    }

    pub fn load(path: &Path, schema: &CatalogSchema) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::read_from(std::io::BufReader::new(file), schema)
    }
}

fn metadata_fields() -> Vec<String> {
    VideoRole::ALL
        .iter()
        .flat_map(|role| {
            ["Duration", "Width", "Height"]
                .into_iter()
                .map(move |field| format!("{} {}", role.slot(), field))
        })
        .collect()
}

fn cell_error(row: &str, column: &str, source: CellError) -> TableError {
    TableError::Cell {
        row: row.to_string(),
        column: column.to_string(),
        source,
    }
}

fn parse_probe(row: &str, role: VideoRole, cells: &[&str]) -> Result<Option<VideoProbe>, TableError> {
    if cells.iter().all(|c| c.is_empty()) {
        return Ok(None);
    }

    let number_error = |field: &str, value: &str| TableError::Number {
        row: row.to_string(),
        column: format!("{} {}", role.slot(), field),
        value: value.to_string(),
    };

    let duration = cells[0]
        .parse::<f64>()
        .map_err(|_| number_error("Duration", cells[0]))?;
    let width = cells[1]
        .parse::<u32>()
        .map_err(|_| number_error("Width", cells[1]))?;
    let height = cells[2]
        .parse::<u32>()
        .map_err(|_| number_error("Height", cells[2]))?;

    Ok(Some(VideoProbe {
        duration,
        width,
        height,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::resolve;

    fn tiny_schema() -> CatalogSchema {
        CatalogSchema {
            title_column: "Transcript".to_string(),
            attributes: vec!["Age Group".to_string()],
            linked_attributes: Vec::new(),
            slots: vec!["Video A".to_string(), "SRT".to_string()],
        }
    }

    fn tiny_entry(id: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            attributes: vec![("Age Group".to_string(), "18-30".to_string())],
            resources: vec![
                ("Video A".to_string(), resolve(["https://x/a.mp4"])),
                ("SRT".to_string(), resolve(["https://x/1.srt", "https://x/2.srt"])),
            ],
        }
    }

    #[test]
    fn test_catalog_only_layout() {
        let table = DatasetTable::new(tiny_schema(), vec![tiny_entry("t__0")]);
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(",Data,URLs,URLs"));
        assert_eq!(lines.next(), Some("Transcript,Age Group,Video A,SRT"));
        assert_eq!(
            lines.next(),
            Some(r#"t__0,18-30,https://x/a.mp4,"[""https://x/1.srt"",""https://x/2.srt""]""#)
        );
    }

    #[test]
    fn test_read_rejects_foreign_header() {
        let text = ",Data\nName,Age Group\n";
        let result = DatasetTable::read_from(text.as_bytes(), &tiny_schema());
        assert!(matches!(result, Err(TableError::Header(_))));
    }

    #[test]
    fn test_set_ledger_rejects_wrong_shape() {
        let mut table = DatasetTable::new(tiny_schema(), vec![tiny_entry("t__0")]);
        let ledger = LedgerEntry {
            id: "t__0".to_string(),
            base_dir: PathBuf::from("/d/t__0"),
            files: vec![
                ("Video A".to_string(), LocalValue::Single(None)),
                ("SRT".to_string(), LocalValue::Single(None)),
            ],
        };
        assert!(matches!(table.set_ledger(ledger), Err(TableError::Shape(_))));
    }

    #[test]
    fn test_round_trip_keeps_rows_without_metadata() {
        let mut table = DatasetTable::new(
            tiny_schema(),
            vec![tiny_entry("t__0"), tiny_entry("t__1"), tiny_entry("t__2")],
        );
        table
            .set_ledger(LedgerEntry {
                id: "t__0".to_string(),
                base_dir: PathBuf::from("/d/t__0"),
                files: vec![
                    ("Video A".to_string(), LocalValue::Single(Some("a.mp4".to_string()))),
                    (
                        "SRT".to_string(),
                        LocalValue::Multiple(vec![None, Some("2.srt".to_string())]),
                    ),
                ],
            })
            .unwrap();
        table
            .set_ledger(LedgerEntry {
                id: "t__1".to_string(),
                base_dir: PathBuf::from("/d/t__1"),
                files: vec![
                    ("Video A".to_string(), LocalValue::Single(None)),
                    ("SRT".to_string(), LocalValue::Multiple(vec![None, None])),
                ],
            })
            .unwrap();
        table.reset_metadata();

        let mut record = MetadataRecord::empty("t__0");
        record.videos[0].1 = Some(VideoProbe {
            duration: 61.5,
            width: 640,
            height: 360,
        });
        table.set_metadata(record).unwrap();

        // t__2 was never acquired
        assert!(table.row("t__2").unwrap().ledger.is_none());
        assert!(table.row("t__2").unwrap().metadata.is_none());
        assert!(table.set_metadata(MetadataRecord::empty("t__2")).is_err());

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let back = DatasetTable::read_from(out.as_slice(), &tiny_schema()).unwrap();
        assert_eq!(back, table);
    }
}
