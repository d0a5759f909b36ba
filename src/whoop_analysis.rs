//! WHOOP-only analysis view
//!
//! Averages and recent trends over the raw WHOOP recovery, workout and sleep
//! collections. Unlike the metrics engine this view works on WHOOP's own
//! fields (recovery score, sleep debt) and does not deduplicate.

use crate::platform::{parse_timestamp, Platform, RecordSet, WhoopData};
use crate::trend::{average, trend, DataPoint, Trend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoopAnalysis {
    pub recovery: RecoveryAnalysis,
    pub workouts: WorkoutAnalysis,
    pub sleep: SleepAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAnalysis {
    pub average_score: f64,
    pub average_strain: f64,
    pub average_resting_hr: f64,
    pub recent_trend: Trend,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutAnalysis {
    pub average_strain: f64,
    pub average_heart_rate: f64,
    /// Mean duration in milliseconds
    pub average_duration: f64,
    pub total_workouts: usize,
    pub recent_trend: Trend,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepAnalysis {
    pub average_quality: f64,
    /// Mean total sleep in milliseconds
    pub average_duration: f64,
    pub average_debt: f64,
    pub recent_trend: Trend,
    pub last_update: Option<DateTime<Utc>>,
}

/// Analyze a WHOOP payload
///
/// Returns `None` when the payload has no recovery, workout or sleep section.
pub fn analyze_whoop(data: &WhoopData) -> Option<WhoopAnalysis> {
    if data.recovery.is_none() && data.workouts.is_none() && data.sleep.is_none() {
        return None;
    }

    let recovery = dated(&data.recovery, |r| &r.timestamp);
    let workouts = dated(&data.workouts, |w| &w.timestamp);
    let sleep = dated(&data.sleep, |s| &s.timestamp);

    let recovery_score = |r: &crate::platform::WhoopRecovery| {
        r.score.as_ref().and_then(|s| s.recovery_score).unwrap_or(0.0)
    };
    let workout_strain = |w: &crate::platform::WhoopWorkout| {
        w.score.as_ref().and_then(|s| s.strain).unwrap_or(0.0)
    };
    let sleep_quality = |s: &crate::platform::WhoopSleep| {
        s.score.as_ref().and_then(|s| s.sleep_quality).unwrap_or(0.0)
    };

    let recovery_analysis = RecoveryAnalysis {
        average_score: average(&collect(&recovery, recovery_score)),
        average_strain: average(&collect(&recovery, |r| {
            r.score.as_ref().and_then(|s| s.strain).unwrap_or(0.0)
        })),
        average_resting_hr: average(&collect(&recovery, |r| {
            r.score.as_ref().and_then(|s| s.resting_heart_rate).unwrap_or(0.0)
        })),
        recent_trend: trend(&points(&recovery, recovery_score)),
        last_update: recovery.last().map(|(ts, _)| *ts),
    };

    let workout_analysis = WorkoutAnalysis {
        average_strain: average(&collect(&workouts, workout_strain)),
        average_heart_rate: average(&collect(&workouts, |w| {
            w.score.as_ref().and_then(|s| s.average_heart_rate).unwrap_or(0.0)
        })),
        average_duration: average(&collect(&workouts, |w| {
            w.score
                .as_ref()
                .and_then(|s| s.duration_ms)
                .or(w.duration_ms)
                .unwrap_or(0.0)
        })),
        total_workouts: workouts.len(),
        recent_trend: trend(&points(&workouts, workout_strain)),
        last_update: workouts.last().map(|(ts, _)| *ts),
    };

    let sleep_analysis = SleepAnalysis {
        average_quality: average(&collect(&sleep, sleep_quality)),
        average_duration: average(&collect(&sleep, |s| {
            s.score.as_ref().and_then(|s| s.total_sleep_ms).unwrap_or(0.0)
        })),
        average_debt: average(&collect(&sleep, |s| {
            s.score.as_ref().and_then(|s| s.sleep_debt_ms).unwrap_or(0.0)
        })),
        recent_trend: trend(&points(&sleep, sleep_quality)),
        last_update: sleep.last().map(|(ts, _)| *ts),
    };

    Some(WhoopAnalysis {
        recovery: recovery_analysis,
        workouts: workout_analysis,
        sleep: sleep_analysis,
    })
}

/// Pair each record with its parsed timestamp, dropping unreadable ones
fn dated<'a, T>(
    set: &'a Option<RecordSet<T>>,
    timestamp: impl Fn(&T) -> &Option<Value>,
) -> Vec<(DateTime<Utc>, &'a T)> {
    let Some(set) = set else {
        return Vec::new();
    };

    set.records
        .iter()
        .filter_map(|record| {
            let raw = timestamp(record).as_ref()?;
            match parse_timestamp(Platform::Whoop, raw) {
                Ok(ts) => Some((ts, record)),
                Err(e) => {
                    warn!(error = %e, "Skipping WHOOP record in analysis");
                    None
                }
            }
        })
        .collect()
}

fn collect<T>(records: &[(DateTime<Utc>, &T)], value: impl Fn(&T) -> f64) -> Vec<f64> {
    records.iter().map(|(_, r)| value(r)).collect()
}

fn points<T>(records: &[(DateTime<Utc>, &T)], value: impl Fn(&T) -> f64) -> Vec<DataPoint> {
    records
        .iter()
        .map(|(ts, r)| DataPoint::new(*ts, value(r)))
        .collect()
}
