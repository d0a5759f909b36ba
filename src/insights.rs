//! Dashboard-ready interpretation of computed metrics

use crate::metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic-light classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Green => write!(f, "green"),
            Band::Yellow => write!(f, "yellow"),
            Band::Red => write!(f, "red"),
        }
    }
}

impl Band {
    /// WHOOP recovery score (0-100)
    pub fn from_recovery_score(score: f64) -> Self {
        if score >= 66.0 {
            Band::Green
        } else if score >= 33.0 {
            Band::Yellow
        } else {
            Band::Red
        }
    }

    /// WHOOP strain (0-21); higher strain is the warning end
    pub fn from_strain(strain: f64) -> Self {
        if strain >= 14.0 {
            Band::Red
        } else if strain >= 8.0 {
            Band::Yellow
        } else {
            Band::Green
        }
    }

    /// Sleep performance score (0-100)
    pub fn from_sleep_score(score: f64) -> Self {
        if score >= 85.0 {
            Band::Green
        } else if score >= 70.0 {
            Band::Yellow
        } else {
            Band::Red
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricInsights {
    /// ATL relative to CTL, in percent
    pub load_trend_pct: Option<f64>,

    /// Today's HRV relative to baseline, in percent
    pub recovery_trend_pct: Option<f64>,

    /// +5 / -5 / 0 depending on the sign of training balance
    pub readiness_trend: i8,

    pub balance_description: String,

    pub workout_type_count: usize,

    pub sleep_band: Band,
}

impl MetricInsights {
    pub fn from_metrics(metrics: &PerformanceMetrics) -> Self {
        let ctl = metrics.long_term_training_load;
        let load_trend_pct = (ctl != 0.0)
            .then(|| (metrics.recent_training_load - ctl) / ctl * 100.0);

        let baseline_hrv = metrics.baseline.hrv;
        let recovery_trend_pct = (baseline_hrv != 0.0)
            .then(|| (metrics.today.hrv - baseline_hrv) / baseline_hrv * 100.0);

        let balance = metrics.training_balance;
        let readiness_trend = if balance > 0.0 {
            5
        } else if balance < 0.0 {
            -5
        } else {
            0
        };

        let balance_description = if balance > 0.0 {
            "Building fitness"
        } else {
            "Recovery phase"
        };

        MetricInsights {
            load_trend_pct,
            recovery_trend_pct,
            readiness_trend,
            balance_description: balance_description.to_string(),
            workout_type_count: metrics.workouts_by_type.len(),
            sleep_band: Band::from_sleep_score(metrics.today.sleep_quality),
        }
    }
}
