//! Aggregate series handed to the chart collaborator.

use std::collections::HashMap;

use serde::Serialize;

use super::stats::durations;
use crate::domain::{DatasetTable, VideoRole};

const AGE_GROUP: &str = "Age Group";
const FORMAT: &str = "Format";
const TOPICS: &str = "Topics";

const HISTOGRAM_BINS: usize = 30;

/// One chart to be drawn by an external plotting tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    /// File name without extension, e.g. `1_Distribution_of_Age_Groups`
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: ChartSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSeries {
    /// Category counts, most frequent first
    Counts { values: Vec<(String, u64)> },
    /// Word frequencies for a word cloud
    WordCloud { words: Vec<(String, u64)> },
    /// Equal-width bins over a numeric range
    Histogram { bins: Vec<HistogramBin> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

/// All charts of the corpus report, in output order
pub fn build_charts(table: &DatasetTable) -> Vec<Chart> {
    let mut charts = vec![
        counts_chart(
            "1_Distribution_of_Age_Groups",
            "Distribution of Age Groups",
            AGE_GROUP,
            attribute_values(table, AGE_GROUP),
        ),
        counts_chart(
            "2_Distribution_of_Formats",
            "Distribution of Formats",
            FORMAT,
            attribute_values(table, FORMAT),
        ),
        counts_chart(
            "3_Distribution_of_Topics",
            "Distribution of Topics",
            "Topic",
            topics(table, None),
        ),
        Chart {
            name: "4_Word_Cloud_of_Topics".to_string(),
            title: "Word Cloud of Topics".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            series: ChartSeries::WordCloud {
                words: word_frequencies(&topics(table, None)),
            },
        },
    ];

    let mut age_groups: Vec<String> = Vec::new();
    for group in attribute_values(table, AGE_GROUP) {
        if !age_groups.contains(&group) {
            age_groups.push(group);
        }
    }
    for group in &age_groups {
        charts.push(Chart {
            name: format!("5_Word_Cloud_for_Age_Group_{}", group),
            title: format!("Word Cloud for Age Group: {}", group),
            x_label: String::new(),
            y_label: String::new(),
            series: ChartSeries::WordCloud {
                words: word_frequencies(&topics(table, Some(group.as_str()))),
            },
        });
    }

    charts.push(Chart {
        name: "6_Distribution_of_Video_Durations".to_string(),
        title: "Distribution of Video Durations".to_string(),
        x_label: "Duration (seconds)".to_string(),
        y_label: "Count".to_string(),
        series: ChartSeries::Histogram {
            bins: histogram(&durations(table, VideoRole::Total), HISTOGRAM_BINS),
        },
    });

    charts
}

fn counts_chart(name: &str, title: &str, label: &str, values: Vec<String>) -> Chart {
    Chart {
        name: name.to_string(),
        title: title.to_string(),
        x_label: label.to_string(),
        y_label: "Count".to_string(),
        series: ChartSeries::Counts {
            values: count_values(values),
        },
    }
}

fn attribute_values(table: &DatasetTable, attribute: &str) -> Vec<String> {
    table
        .rows
        .iter()
        .filter_map(|r| r.entry.attribute(attribute))
        .map(str::to_string)
        .collect()
}

/// Individual topics, optionally restricted to one age group
fn topics(table: &DatasetTable, age_group: Option<&str>) -> Vec<String> {
    table
        .rows
        .iter()
        .filter(|r| age_group.map_or(true, |g| r.entry.attribute(AGE_GROUP) == Some(g)))
        .filter_map(|r| r.entry.attribute(TOPICS))
        .flat_map(|t| t.split(", "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Counts sorted by frequency, ties broken alphabetically
pub fn count_values(values: Vec<String>) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, u64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn word_frequencies(topics: &[String]) -> Vec<(String, u64)> {
    let words = topics
        .iter()
        .flat_map(|t| t.split_whitespace())
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > 1)
        .collect();
    count_values(words)
}

/// Equal-width histogram; a constant series lands in one bin
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: values.len() as u64,
        }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for value in values {
        let index = (((value - min) / width) as usize).min(bins - 1);
        result[index].count += 1;
    }
    result
}
