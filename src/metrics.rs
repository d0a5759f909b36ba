use crate::dedup::deduplicate_with_report;
use crate::error::{BlisterError, Result};
use crate::load::{age_predicted_max_hr, LoadCalculator, DEFAULT_AGE, DEFAULT_RESTING_HR};
use crate::models::{RecoveryRecord, RecoverySnapshot, WorkoutRecord};
use crate::platform::PlatformData;
use crate::readiness::{
    baseline, build_day_map, race_readiness, today_recovery, training_readiness,
    DEFAULT_BASELINE,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Training-load and readiness summary for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Acute Training Load: mean load over the recent window
    pub recent_training_load: f64,

    /// Chronic Training Load: mean load over the long-term window
    pub long_term_training_load: f64,

    /// CTL - ATL
    pub training_balance: f64,

    /// Training Readiness Score
    pub training_readiness: f64,

    /// Race Readiness Index
    pub race_readiness: f64,

    pub total_workouts: usize,

    /// Workouts inside the recent window
    pub recent_workouts: usize,

    pub workouts_by_type: BTreeMap<String, usize>,

    pub total_distance_km: f64,

    /// Average recovery over the days before today
    pub baseline: RecoverySnapshot,

    /// Today's recovery, or the baseline when today has no reading
    pub today: RecoverySnapshot,
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Acute load window in days (default: 7)
    pub recent_window_days: u32,

    /// Chronic load window in days (default: 28)
    pub long_term_window_days: u32,

    /// Days before today averaged into the recovery baseline (default: 7)
    pub baseline_window_days: u32,

    /// Resting heart rate for HR-derived intensity (default: 60)
    pub resting_hr: u16,

    /// Age used for the 220 - age max HR estimate (default: 30)
    pub athlete_age: u16,

    /// Baseline reported when no recovery data is in the window
    pub baseline_defaults: RecoverySnapshot,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            recent_window_days: 7,
            long_term_window_days: 28,
            baseline_window_days: 7,
            resting_hr: DEFAULT_RESTING_HR,
            athlete_age: DEFAULT_AGE,
            baseline_defaults: DEFAULT_BASELINE,
        }
    }
}

impl MetricsConfig {
    pub fn max_hr(&self) -> u16 {
        age_predicted_max_hr(self.athlete_age)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recent_window_days == 0 || self.long_term_window_days == 0 {
            return Err(BlisterError::Configuration(
                "training load windows must be at least one day".to_string(),
            ));
        }
        if self.baseline_window_days == 0 {
            return Err(BlisterError::Configuration(
                "baseline window must be at least one day".to_string(),
            ));
        }
        if self.max_hr() <= self.resting_hr {
            return Err(BlisterError::Configuration(format!(
                "max heart rate {} must exceed resting heart rate {}",
                self.max_hr(),
                self.resting_hr
            )));
        }
        Ok(())
    }
}

/// Computes [`PerformanceMetrics`] from platform payloads
///
/// Holds only configuration; every call works solely on its arguments.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    config: MetricsConfig,
    load: LoadCalculator,
}

impl MetricsEngine {
    /// Create engine with default configuration
    pub fn new() -> Self {
        Self::with_config(MetricsConfig::default())
    }

    /// Create engine with custom configuration
    pub fn with_config(config: MetricsConfig) -> Self {
        let load = LoadCalculator::with_heart_rate(config.resting_hr, config.max_hr());
        MetricsEngine { config, load }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Compute metrics as of the current instant
    pub fn compute(&self, data: &PlatformData) -> PerformanceMetrics {
        self.compute_at(data, Utc::now())
    }

    /// Compute metrics as of `now`
    pub fn compute_at(&self, data: &PlatformData, now: DateTime<Utc>) -> PerformanceMetrics {
        let normalized = data.normalize();
        self.compute_from_records(normalized.workouts, &normalized.recovery, now)
    }

    /// Compute metrics from already-normalized records
    ///
    /// Recovery records must be in arrival order; later same-day records win.
    pub fn compute_from_records(
        &self,
        workouts: Vec<WorkoutRecord>,
        recovery: &[RecoveryRecord],
        now: DateTime<Utc>,
    ) -> PerformanceMetrics {
        let dedup = deduplicate_with_report(workouts);
        let workouts = dedup.retained;

        let recent: Vec<&WorkoutRecord> =
            within_window(&workouts, now, self.config.recent_window_days).collect();
        let long_term: Vec<&WorkoutRecord> =
            within_window(&workouts, now, self.config.long_term_window_days).collect();

        let atl = self.load.mean_load(recent.iter().copied());
        let ctl = self.load.mean_load(long_term.iter().copied());
        let training_balance = ctl - atl;

        let days = build_day_map(recovery);
        let today_date = now.date_naive();
        let baseline = baseline(
            &days,
            today_date,
            self.config.baseline_window_days,
            self.config.baseline_defaults,
        );
        let today = today_recovery(&days, today_date, baseline);

        let trs = training_readiness(&today, &baseline);
        let rri = race_readiness(trs, ctl, training_balance);

        let mut workouts_by_type = BTreeMap::new();
        for workout in &workouts {
            *workouts_by_type
                .entry(workout.activity_type.clone())
                .or_insert(0) += 1;
        }

        let total_distance_km = workouts
            .iter()
            .map(|w| w.distance_meters.unwrap_or(0.0))
            .sum::<f64>()
            / 1000.0;

        debug!(
            total = workouts.len(),
            duplicates = dedup.discarded,
            recent = recent.len(),
            long_term = long_term.len(),
            recovery_days = days.len(),
            atl,
            ctl,
            trs,
            "Computed performance metrics"
        );

        PerformanceMetrics {
            recent_training_load: atl,
            long_term_training_load: ctl,
            training_balance,
            training_readiness: trs,
            race_readiness: rri,
            total_workouts: workouts.len(),
            recent_workouts: recent.len(),
            workouts_by_type,
            total_distance_km,
            baseline,
            today,
        }
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute metrics with default settings, as of now
pub fn compute_metrics(data: &PlatformData) -> PerformanceMetrics {
    MetricsEngine::new().compute(data)
}

/// Workouts no older than `days` relative to `now`
///
/// Timestamps after `now` count as inside the window.
fn within_window(
    workouts: &[WorkoutRecord],
    now: DateTime<Utc>,
    days: u32,
) -> impl Iterator<Item = &WorkoutRecord> {
    let window = TimeDelta::days(i64::from(days));
    workouts
        .iter()
        .filter(move |w| now.signed_duration_since(w.timestamp) <= window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn workout_days_ago(days: i64, duration_ms: u64, source: Source) -> WorkoutRecord {
        WorkoutRecord::new(now() - TimeDelta::days(days), "run", duration_ms, source)
    }

    #[test]
    fn test_empty_input() {
        let metrics = MetricsEngine::new().compute_at(&PlatformData::default(), now());

        assert_eq!(metrics.total_workouts, 0);
        assert_eq!(metrics.recent_workouts, 0);
        assert_eq!(metrics.recent_training_load, 0.0);
        assert_eq!(metrics.long_term_training_load, 0.0);
        assert_eq!(metrics.training_balance, 0.0);
        assert_eq!(metrics.baseline, DEFAULT_BASELINE);
        assert_eq!(metrics.today, DEFAULT_BASELINE);
        assert_eq!(metrics.training_readiness, 175.0);
        assert_eq!(metrics.race_readiness, 175.0);
        assert!(metrics.workouts_by_type.is_empty());
        assert_eq!(metrics.total_distance_km, 0.0);
    }

    #[test]
    fn test_windows_are_independent() {
        let engine = MetricsEngine::new();
        let workouts = vec![
            workout_days_ago(1, 3_600_000, Source::Garmin),  // 60
            workout_days_ago(10, 1_800_000, Source::Garmin), // 30
            workout_days_ago(40, 7_200_000, Source::Garmin), // outside both
        ];

        let metrics = engine.compute_from_records(workouts, &[], now());
        assert_eq!(metrics.total_workouts, 3);
        assert_eq!(metrics.recent_workouts, 1);
        assert_eq!(metrics.recent_training_load, 60.0);
        assert_eq!(metrics.long_term_training_load, 45.0);
        assert_eq!(metrics.training_balance, -15.0);

        // 175 * (1 - 15/45)
        assert!((metrics.race_readiness - 116.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_window_boundary_inclusive() {
        let metrics = MetricsEngine::new().compute_from_records(
            vec![workout_days_ago(7, 600_000, Source::Strava)],
            &[],
            now(),
        );
        assert_eq!(metrics.recent_workouts, 1);
    }

    #[test]
    fn test_duplicates_collapsed_before_loading() {
        let mut strava = workout_days_ago(2, 3_600_000, Source::Strava);
        strava.average_heart_rate = Some(150);
        let garmin = workout_days_ago(2, 3_600_000, Source::Garmin);

        let metrics = MetricsEngine::new().compute_from_records(vec![strava, garmin], &[], now());
        assert_eq!(metrics.total_workouts, 1);
        // Garmin record has no HR data so nominal intensity applies
        assert_eq!(metrics.recent_training_load, 60.0);
    }

    #[test]
    fn test_distance_and_types() {
        let mut workouts = Vec::new();
        for (i, (meters, kind)) in [(1000.0, "run"), (2000.0, "ride"), (5000.0, "run")]
            .into_iter()
            .enumerate()
        {
            let mut w = workout_days_ago(i as i64, 1_000 * (i as u64 + 1), Source::Strava);
            w.activity_type = kind.to_string();
            w.distance_meters = Some(meters);
            workouts.push(w);
        }

        let metrics = MetricsEngine::new().compute_from_records(workouts, &[], now());
        assert_eq!(metrics.total_distance_km, 8.0);
        assert_eq!(metrics.workouts_by_type["run"], 2);
        assert_eq!(metrics.workouts_by_type["ride"], 1);
    }

    #[test]
    fn test_recovery_today_and_baseline() {
        let day = |d: u32| chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let recovery = vec![
            RecoveryRecord { date: day(13), hrv: 60.0, resting_heart_rate: 52.0, sleep_quality: 70.0 },
            RecoveryRecord { date: day(14), hrv: 80.0, resting_heart_rate: 48.0, sleep_quality: 90.0 },
            RecoveryRecord { date: day(15), hrv: 84.0, resting_heart_rate: 51.0, sleep_quality: 85.0 },
        ];

        let metrics = MetricsEngine::new().compute_from_records(Vec::new(), &recovery, now());
        assert_eq!(metrics.baseline.hrv, 70.0);
        assert_eq!(metrics.baseline.resting_heart_rate, 50.0);
        assert_eq!(metrics.today.hrv, 84.0);
        // 100 * 1.2 - 5 * 1 + 85
        assert!((metrics.training_readiness - 200.0).abs() < 1e-9);
        assert_eq!(metrics.race_readiness, metrics.training_readiness);
    }

    #[test]
    fn test_future_workouts_count_as_recent() {
        let metrics = MetricsEngine::new().compute_from_records(
            vec![workout_days_ago(-1, 600_000, Source::Strava)],
            &[],
            now(),
        );
        assert_eq!(metrics.recent_workouts, 1);
    }

    #[test]
    fn test_custom_config() {
        let config = MetricsConfig {
            recent_window_days: 3,
            ..MetricsConfig::default()
        };
        let engine = MetricsEngine::with_config(config);
        let metrics = engine.compute_from_records(
            vec![workout_days_ago(5, 600_000, Source::Strava)],
            &[],
            now(),
        );
        assert_eq!(metrics.recent_workouts, 0);
        assert_eq!(metrics.total_workouts, 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(MetricsConfig::default().validate().is_ok());

        let bad = MetricsConfig {
            athlete_age: 170,
            ..MetricsConfig::default()
        };
        assert!(bad.validate().is_err());

        let bad = MetricsConfig {
            long_term_window_days: 0,
            ..MetricsConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_output_field_names() {
        let metrics = MetricsEngine::new().compute_at(&PlatformData::default(), now());
        let json = serde_json::to_value(&metrics).unwrap();

        assert_eq!(json["recentTrainingLoad"], 0.0);
        assert_eq!(json["baseline"]["restingHeartRate"], 50.0);
        assert_eq!(json["baseline"]["sleepQuality"], 75.0);
        assert!(json["workoutsByType"].is_object());
        assert!(json.get("totalDistanceKm").is_some());
    }
}
