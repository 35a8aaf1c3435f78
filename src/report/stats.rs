//! Duration statistics over the total-view videos.

use std::fmt;

use crate::domain::{DatasetTable, VideoRole};

/// Summary of a set of durations in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined below two samples
    pub std_dev: Option<f64>,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl DurationStats {
    /// Statistics over non-NaN values, `None` if there are none
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        let mean = sum / count as f64;
        let std_dev = (count > 1).then(|| {
            let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        });
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Some(Self {
            count,
            mean,
            std_dev,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            sum,
        })
    }

    /// Statistics over the total-view durations of a table
    pub fn for_table(table: &DatasetTable) -> Option<Self> {
        Self::from_values(&durations(table, VideoRole::Total))
    }
}

/// Non-null durations of one role, in row order
pub fn durations(table: &DatasetTable, role: VideoRole) -> Vec<f64> {
    table
        .rows
        .iter()
        .filter_map(|row| row.metadata.as_ref())
        .filter_map(|m| m.video(role))
        .map(|p| p.duration)
        .collect()
}

impl fmt::Display for DurationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of videos: {}", self.count)?;
        writeln!(f, "Mean duration: {}", format_hms(self.mean))?;
        match self.std_dev {
            Some(std_dev) => writeln!(f, "Standard deviation: {}", format_hms(std_dev))?,
            None => writeln!(f, "Standard deviation: n/a")?,
        }
        writeln!(f, "Median duration: {}", format_hms(self.median))?;
        writeln!(f, "Maximum duration: {}", format_hms(self.max))?;
        writeln!(f, "Minimum duration: {}", format_hms(self.min))?;
        write!(f, "Total duration: {}", format_hms(self.sum))
    }
}

/// Human-readable duration: hours and minutes only when non-zero
pub fn format_hms(seconds: f64) -> String {
    // Round first so 59.999 carries into the next minute
    let centis = (seconds * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = centis % 360_000 / 6_000;
    let rest = (centis % 6_000) as f64 / 100.0;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{} hours", hours));
    }
    if minutes > 0 {
        parts.push(format!("{} minutes", minutes));
    }
    parts.push(format!("{:.2} seconds", rest));
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(3661.0), "1 hours, 1 minutes, 1.00 seconds");
        assert_eq!(format_hms(45.5), "45.50 seconds");
        assert_eq!(format_hms(7200.0), "2 hours, 0.00 seconds");
        assert_eq!(format_hms(125.257), "2 minutes, 5.26 seconds");
        assert_eq!(format_hms(0.0), "0.00 seconds");
        assert_eq!(format_hms(59.999), "1 minutes, 0.00 seconds");
        assert_eq!(format_hms(3599.996), "1 hours, 0.00 seconds");
    }

    #[test]
    fn test_stats() {
        let stats = DurationStats::from_values(&[10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 25.0);
        assert_eq!(stats.median, 25.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.sum, 100.0);
        let std_dev = stats.std_dev.unwrap();
        assert!((std_dev - 12.909944).abs() < 1e-6);
    }

    #[test]
    fn test_stats_edge_cases() {
        assert!(DurationStats::from_values(&[]).is_none());

        let single = DurationStats::from_values(&[5.0]).unwrap();
        assert_eq!(single.median, 5.0);
        assert!(single.std_dev.is_none());
        assert!(single.to_string().contains("Standard deviation: n/a"));

        let odd = DurationStats::from_values(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(odd.median, 2.0);
    }
}
