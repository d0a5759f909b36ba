//! Small averaging and trend helpers used by the analysis views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum change between the last two points to count as a trend
pub const TREND_EPSILON: f64 = 0.05;

/// How many of the most recent points a trend looks at
const TREND_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Declining => write!(f, "declining"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// A dated observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

impl DataPoint {
    pub fn new(date: DateTime<Utc>, value: f64) -> Self {
        DataPoint { date, value }
    }
}

/// Arithmetic mean, 0 for empty input
pub fn average(numbers: &[f64]) -> f64 {
    if numbers.is_empty() {
        return 0.0;
    }
    numbers.iter().sum::<f64>() / numbers.len() as f64
}

/// Direction of the most recent change in a series
///
/// Points are ordered by date first; only the final two of the last three
/// points are compared. Fewer than two points is `Stable`.
pub fn trend(points: &[DataPoint]) -> Trend {
    if points.len() < 2 {
        return Trend::Stable;
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));
    let recent = &sorted[sorted.len().saturating_sub(TREND_WINDOW)..];

    let last_diff = recent[recent.len() - 1].value - recent[recent.len() - 2].value;
    if last_diff.abs() < TREND_EPSILON {
        Trend::Stable
    } else if last_diff > 0.0 {
        Trend::Improving
    } else {
        Trend::Declining
    }
}
