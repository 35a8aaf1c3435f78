//! Chart output as JSON series.
//!
//! Each chart is written to `<dir>/<name>.json` for an external plotting
//! tool to draw.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::ChartRenderer;
use crate::report::Chart;

pub struct JsonChartWriter {
    dir: PathBuf,
}

impl JsonChartWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Keep names usable as file names on every platform
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

impl ChartRenderer for JsonChartWriter {
    fn render(&self, chart: &Chart) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.json", file_stem(&chart.name)));
        let content = serde_json::to_string_pretty(chart).context("Failed to serialize chart")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write chart: {}", path.display()))?;
        Ok(path)
    }
}
