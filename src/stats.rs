//! Per-row statistics for the progress display

use crate::record::RoundRow;
use serde::Serialize;

/// Derived statistics over one row's successful runs; never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSummary {
    /// Runs that produced a measurement
    pub successes: usize,
    /// Runs recorded as failure markers
    pub failures: usize,
    /// Arithmetic mean of the successful runs, absent when there are none
    pub mean: Option<f64>,
    /// Population standard deviation; undefined below 2 successes
    pub std_dev: Option<f64>,
}

impl RoundSummary {
    /// Compute the summary for a completed row
    ///
    /// The row's runs are the complete population of interest, so the
    /// population formula is used, not the sample one. With fewer than 2
    /// successes the deviation is reported as undefined rather than zero.
    pub fn from_row(row: &RoundRow) -> Self {
        let values: Vec<f64> = row.successes().map(|v| v as f64).collect();
        let successes = values.len();
        let failures = row.runs.len() - successes;

        let mean = if successes > 0 {
            Some(values.iter().sum::<f64>() / successes as f64)
        } else {
            None
        };

        let std_dev = match (mean, successes) {
            (Some(m), n) if n >= 2 => {
                let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
                Some(variance.sqrt())
            }
            _ => None,
        };

        Self {
            successes,
            failures,
            mean,
            std_dev,
        }
    }

    /// One-line rendering for the progress display
    pub fn render(&self) -> String {
        match (self.mean, self.std_dev) {
            (Some(mean), Some(std_dev)) => {
                format!("average={mean:.1}, stdev={std_dev:.1}")
            }
            (Some(mean), None) => format!("average={mean:.1}, stdev=undefined"),
            (None, _) => "no successful runs".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RunFailure, RunResult};

    fn row_of(values: &[i64]) -> RoundRow {
        RoundRow::new(
            "bzImage",
            0,
            values.iter().map(|v| RunResult::Measured(*v)).collect(),
        )
    }

    #[test]
    fn test_mean_and_population_std_dev() {
        let summary = RoundSummary::from_row(&row_of(&[2, 4, 4, 4, 5, 5, 7, 9]));
        assert_eq!(summary.successes, 8);
        assert_eq!(summary.mean, Some(5.0));
        // Population deviation of the classic example set is exactly 2.
        assert_eq!(summary.std_dev, Some(2.0));
    }

    #[test]
    fn test_single_success_has_undefined_std_dev() {
        let summary = RoundSummary::from_row(&row_of(&[100]));
        assert_eq!(summary.mean, Some(100.0));
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.render(), "average=100.0, stdev=undefined");
    }

    #[test]
    fn test_all_failed_row() {
        let row = RoundRow::from_failure("bzImage", 0, 3, RunFailure::EmptyOutput);
        let summary = RoundSummary::from_row(&row);
        assert_eq!(summary.successes, 0);
        assert_eq!(summary.failures, 3);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.std_dev, None);
        assert_eq!(summary.render(), "no successful runs");
    }

    #[test]
    fn test_failures_excluded_from_mean() {
        let row = RoundRow::new(
            "bzImage",
            0,
            vec![
                RunResult::Measured(100),
                RunResult::Failed(RunFailure::EmptyOutput),
                RunResult::Measured(102),
            ],
        );
        let summary = RoundSummary::from_row(&row);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.mean, Some(101.0));
        assert_eq!(summary.std_dev, Some(1.0));
    }
}
