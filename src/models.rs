use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform a workout record was reported by
///
/// Ordering of fidelity is garmin > wahoo > strava = whoop. Anything else
/// deserializes as `Unknown` and never wins a dedup collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Garmin,
    Wahoo,
    Strava,
    Whoop,
    #[serde(other)]
    Unknown,
}

impl Source {
    /// Fixed priority used when two platforms report the same workout
    pub fn priority(&self) -> u8 {
        match self {
            Source::Garmin => 3,
            Source::Wahoo => 2,
            Source::Strava | Source::Whoop => 1,
            Source::Unknown => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Garmin => "garmin",
            Source::Wahoo => "wahoo",
            Source::Strava => "strava",
            Source::Whoop => "whoop",
            Source::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "garmin" => Source::Garmin,
            "wahoo" => Source::Wahoo,
            "strava" => Source::Strava,
            "whoop" => Source::Whoop,
            _ => Source::Unknown,
        })
    }
}

/// A single exercise session in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    /// When the workout occurred
    pub timestamp: DateTime<Utc>,

    /// Activity kind, e.g. "run" or "ride"
    #[serde(rename = "type")]
    pub activity_type: String,

    /// Duration in milliseconds
    #[serde(default)]
    pub duration_ms: u64,

    /// Reporting platform
    pub source: Source,

    /// Platform-native intensity score (WHOOP scale, roughly 0-21)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strain: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_heart_rate: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<u16>,

    /// Distance covered in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl WorkoutRecord {
    /// Bare record with no intensity or distance data
    pub fn new(
        timestamp: DateTime<Utc>,
        activity_type: impl Into<String>,
        duration_ms: u64,
        source: Source,
    ) -> Self {
        WorkoutRecord {
            timestamp,
            activity_type: activity_type.into(),
            duration_ms,
            source,
            strain: None,
            average_heart_rate: None,
            max_heart_rate: None,
            distance_meters: None,
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms as f64 / 60_000.0
    }
}

/// One day's recovery readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRecord {
    /// Calendar day (UTC) the reading belongs to
    pub date: NaiveDate,

    /// Heart rate variability in milliseconds
    pub hrv: f64,

    pub resting_heart_rate: f64,

    /// Sleep quality score 0-100
    pub sleep_quality: f64,
}

impl RecoveryRecord {
    pub fn snapshot(&self) -> RecoverySnapshot {
        RecoverySnapshot {
            hrv: self.hrv,
            resting_heart_rate: self.resting_heart_rate,
            sleep_quality: self.sleep_quality,
        }
    }
}

/// Recovery values compared by the readiness math (baseline or today)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySnapshot {
    pub hrv: f64,
    pub resting_heart_rate: f64,
    pub sleep_quality: f64,
}

/// One night's sleep summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
    pub timestamp: DateTime<Utc>,
    pub sleep_quality: f64,
    pub total_sleep_ms: f64,
    pub sleep_needed_ms: f64,
    pub sleep_debt_ms: f64,
}
