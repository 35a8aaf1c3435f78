//! Aggregation and reporting over a dataset table.
//!
//! Computes duration statistics and the series behind the corpus charts.
//! Drawing the charts is left to a [`crate::adapters::ChartRenderer`].

pub mod charts;
pub mod stats;

pub use charts::{build_charts, histogram, Chart, ChartSeries, HistogramBin};
pub use stats::{format_hms, DurationStats};
