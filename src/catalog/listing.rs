//! Video listing: one `video_id,language` pair per line.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AllowList, CatalogError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRow {
    pub video_id: String,
    pub language: String,
}

/// Read a listing; an optional `video_id,language` header line is skipped
pub fn read_listing<R: Read>(reader: R, source: &Path) -> Result<Vec<ListingRow>, CatalogError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|e| CatalogError::Listing {
            path: source.to_path_buf(),
            source: e,
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() < 2 {
            return Err(CatalogError::ListingRow {
                line,
                found: record.len(),
            });
        }
        if line == 1 && &record[0] == "video_id" {
            continue;
        }

        rows.push(ListingRow {
            video_id: record[0].to_string(),
            language: record[1].to_string(),
        });
    }
    Ok(rows)
}

pub fn load_listing(path: &Path) -> Result<Vec<ListingRow>, CatalogError> {
    let file = File::open(path).map_err(|e| CatalogError::Listing {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    read_listing(file, path)
}

/// Group video ids by language, keeping first-appearance order
pub fn group_by_language(rows: Vec<ListingRow>, allow: &AllowList) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for row in rows.into_iter().filter(|r| allow.allows(&r.language)) {
        match groups.iter_mut().find(|(lang, _)| *lang == row.language) {
            Some((_, ids)) => ids.push(row.video_id),
            None => groups.push((row.language, vec![row.video_id])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_listing() {
        let data = "video_id,language\nabc123,de\nxyz789,ase\n\ndef456,de\n";
        let rows = read_listing(data.as_bytes(), Path::new("listing.csv")).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            ListingRow {
                video_id: "abc123".to_string(),
                language: "de".to_string()
            }
        );
    }

    #[test]
    fn test_short_row_is_rejected() {
        let err = read_listing("abc123\n".as_bytes(), Path::new("listing.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::ListingRow { line: 1, found: 1 }));
    }

    #[test]
    fn test_group_by_language() {
        let rows = read_listing("a,de\nb,ase\nc,de\nd,fr\n".as_bytes(), Path::new("l.csv")).unwrap();
        let allow = AllowList::new(&["de", "ase"]).unwrap();
        let groups = group_by_language(rows, &allow);
        assert_eq!(
            groups,
            vec![
                ("de".to_string(), vec!["a".to_string(), "c".to_string()]),
                ("ase".to_string(), vec!["b".to_string()]),
            ]
        );
    }
}
