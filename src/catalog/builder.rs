//! Catalog Builder for markup indexes.
//!
//! The index is the first `<table>` of an HTML page. Its first row holds the
//! `<th>` headers, which must equal the schema exactly; every following row
//! with `<td>` cells is one entry.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

use super::CatalogError;
use crate::adapters::Fetcher;
use crate::domain::{assign_ids, resolve, CatalogEntry, CatalogSchema};

/// Length of the `../` prefix on resource hrefs
const HREF_PREFIX_LEN: usize = 3;

fn selector(css: &str) -> Result<Selector, CatalogError> {
    Selector::parse(css).map_err(|e| CatalogError::Selector(e.to_string()))
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Fetch the index page and build the catalog from it
#[instrument(skip(fetcher, schema))]
pub async fn fetch_catalog(
    fetcher: &dyn Fetcher,
    index_url: &str,
    download_base: &str,
    schema: &CatalogSchema,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let html = fetcher.fetch_text(index_url).await?;
    let entries = parse_index(&html, download_base, schema)?;
    info!(entries = entries.len(), "Catalog built");
    Ok(entries)
}

/// Build catalog entries from index markup
pub fn parse_index(
    html: &str,
    download_base: &str,
    schema: &CatalogSchema,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;
    let link_sel = selector("a")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(CatalogError::MissingTable)?;
    let mut rows = table.select(&row_sel);

    let header_row = rows.next().ok_or(CatalogError::MissingHeader)?;
    let found: Vec<String> = header_row.select(&th_sel).map(|c| text_of(&c)).collect();
    if found.is_empty() {
        return Err(CatalogError::MissingHeader);
    }
    let expected = schema.header();
    if found != expected {
        return Err(CatalogError::SchemaMismatch { expected, found });
    }

    let mut titles = Vec::new();
    let mut bodies = Vec::new();

    for (index, row) in rows.enumerate() {
        let cells: Vec<ElementRef<'_>> = row.select(&td_sel).collect();
        if cells.is_empty() {
            continue;
        }
        let row_number = index + 1;
        if cells.len() < expected.len() {
            return Err(CatalogError::RowWidth {
                row: row_number,
                expected: expected.len(),
                found: cells.len(),
            });
        }

        let mut cells = cells.into_iter();
        let title = cells.next().map(|c| text_of(&c)).unwrap_or_default();

        let mut attributes = Vec::with_capacity(schema.attributes.len());
        for (name, cell) in schema.attributes.iter().zip(cells.by_ref()) {
            let value = if schema.is_linked(name) {
                cell.select(&link_sel)
                    .map(|a| text_of(&a))
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                text_of(&cell)
            };
            attributes.push((name.clone(), value));
        }

        let mut resources = Vec::with_capacity(schema.slots.len());
        for (slot, cell) in schema.slots.iter().zip(cells) {
            let mut links = Vec::new();
            for href in cell.select(&link_sel).filter_map(|a| a.value().attr("href")) {
                match href.get(HREF_PREFIX_LEN..).filter(|r| !r.is_empty()) {
                    Some(relative) => links.push(format!("{}{}", download_base, relative)),
                    None => warn!(row = row_number, slot = %slot, href, "Skipping link without a relative path"),
                }
            }
            resources.push((slot.clone(), resolve(links)));
        }

        titles.push(title);
        bodies.push((attributes, resources));
    }

    let ids = assign_ids(titles.iter().map(String::as_str));
    debug!(rows = ids.len(), "Parsed index rows");

    Ok(ids
        .into_iter()
        .zip(bodies)
        .map(|(id, (attributes, resources))| CatalogEntry {
            id,
            attributes,
            resources,
        })
        .collect())
}
