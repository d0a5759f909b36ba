//! Recovery baseline and readiness scores
//!
//! Daily recovery readings are folded into a day-keyed map, averaged over
//! the days preceding today to form a personal baseline, and compared with
//! today's reading to produce the Training Readiness Score (TRS). The Race
//! Readiness Index (RRI) then discounts TRS by how far training balance has
//! drifted from chronic load.

use crate::models::{RecoveryRecord, RecoverySnapshot};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Baseline used when no recovery data falls inside the window
pub const DEFAULT_BASELINE: RecoverySnapshot = RecoverySnapshot {
    hrv: 70.0,
    resting_heart_rate: 50.0,
    sleep_quality: 75.0,
};

/// TRS weight on the HRV ratio
const HRV_RATIO_WEIGHT: f64 = 100.0;

/// TRS penalty per bpm of resting HR above baseline
const RESTING_HR_PENALTY: f64 = 5.0;

/// Fold recovery records into a day-keyed map
///
/// Records are applied in input order, so a later record for the same day
/// replaces an earlier one.
pub fn build_day_map(records: &[RecoveryRecord]) -> BTreeMap<NaiveDate, RecoverySnapshot> {
    let mut days = BTreeMap::new();
    for record in records {
        days.insert(record.date, record.snapshot());
    }
    days
}

/// Average recovery over the `window_days` days before `today`
///
/// Today is excluded. Falls back to `defaults` when the window is empty.
pub fn baseline(
    days: &BTreeMap<NaiveDate, RecoverySnapshot>,
    today: NaiveDate,
    window_days: u32,
    defaults: RecoverySnapshot,
) -> RecoverySnapshot {
    let start = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);

    let window: Vec<&RecoverySnapshot> = days.range(start..today).map(|(_, s)| s).collect();
    if window.is_empty() {
        return defaults;
    }

    let n = window.len() as f64;
    RecoverySnapshot {
        hrv: window.iter().map(|s| s.hrv).sum::<f64>() / n,
        resting_heart_rate: window.iter().map(|s| s.resting_heart_rate).sum::<f64>() / n,
        sleep_quality: window.iter().map(|s| s.sleep_quality).sum::<f64>() / n,
    }
}

/// Today's reading, or the baseline when today has none
pub fn today_recovery(
    days: &BTreeMap<NaiveDate, RecoverySnapshot>,
    today: NaiveDate,
    baseline: RecoverySnapshot,
) -> RecoverySnapshot {
    days.get(&today).copied().unwrap_or(baseline)
}

/// Training Readiness Score
///
/// `100 * hrv_ratio - 5 * resting_hr_delta + sleep_quality`. The HRV term
/// contributes 0 when the baseline HRV is 0.
pub fn training_readiness(today: &RecoverySnapshot, baseline: &RecoverySnapshot) -> f64 {
    let hrv_term = if baseline.hrv == 0.0 {
        0.0
    } else {
        HRV_RATIO_WEIGHT * (today.hrv / baseline.hrv)
    };

    hrv_term - RESTING_HR_PENALTY * (today.resting_heart_rate - baseline.resting_heart_rate)
        + today.sleep_quality
}

/// Race Readiness Index
pub fn race_readiness(trs: f64, ctl: f64, training_balance: f64) -> f64 {
    if ctl > 0.0 {
        trs * (1.0 - training_balance.abs() / ctl)
    } else {
        trs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(d: u32, hrv: f64, rhr: f64, sleep: f64) -> RecoveryRecord {
        RecoveryRecord {
            date: day(d),
            hrv,
            resting_heart_rate: rhr,
            sleep_quality: sleep,
        }
    }

    #[test]
    fn test_day_map_last_write_wins() {
        let days = build_day_map(&[record(10, 50.0, 55.0, 60.0), record(10, 80.0, 45.0, 90.0)]);
        assert_eq!(days.len(), 1);
        assert_eq!(days[&day(10)].hrv, 80.0);
    }

    #[test]
    fn test_baseline_defaults_when_empty() {
        let days = BTreeMap::new();
        assert_eq!(baseline(&days, day(15), 7, DEFAULT_BASELINE), DEFAULT_BASELINE);
    }

    #[test]
    fn test_baseline_excludes_today_and_old_days() {
        let days = build_day_map(&[
            record(1, 10.0, 10.0, 10.0),  // outside window
            record(8, 60.0, 50.0, 70.0),  // first day of window
            record(14, 80.0, 40.0, 90.0), // yesterday
            record(15, 999.0, 99.0, 0.0), // today
        ]);

        let b = baseline(&days, day(15), 7, DEFAULT_BASELINE);
        assert_eq!(b.hrv, 70.0);
        assert_eq!(b.resting_heart_rate, 45.0);
        assert_eq!(b.sleep_quality, 80.0);
    }

    #[test]
    fn test_baseline_only_today_uses_defaults() {
        let days = build_day_map(&[record(15, 65.0, 48.0, 90.0)]);
        assert_eq!(baseline(&days, day(15), 7, DEFAULT_BASELINE), DEFAULT_BASELINE);
    }

    #[test]
    fn test_today_falls_back_to_baseline() {
        let days = build_day_map(&[record(14, 60.0, 52.0, 80.0)]);
        let b = baseline(&days, day(15), 7, DEFAULT_BASELINE);
        assert_eq!(today_recovery(&days, day(15), b), b);
    }

    #[test]
    fn test_training_readiness_formula() {
        let today = RecoverySnapshot {
            hrv: 77.0,
            resting_heart_rate: 52.0,
            sleep_quality: 80.0,
        };
        // 100 * 1.1 - 5 * 2 + 80
        let trs = training_readiness(&today, &DEFAULT_BASELINE);
        assert!((trs - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_training_readiness_at_baseline() {
        let trs = training_readiness(&DEFAULT_BASELINE, &DEFAULT_BASELINE);
        assert_eq!(trs, 175.0);
    }

    #[test]
    fn test_zero_baseline_hrv_guard() {
        let zero = RecoverySnapshot {
            hrv: 0.0,
            resting_heart_rate: 50.0,
            sleep_quality: 70.0,
        };
        let trs = training_readiness(&zero, &zero);
        assert!(trs.is_finite());
        assert_eq!(trs, 70.0);
    }

    #[test]
    fn test_race_readiness() {
        assert_eq!(race_readiness(150.0, 0.0, 10.0), 150.0);
        assert_eq!(race_readiness(150.0, 40.0, -10.0), 112.5);
        assert_eq!(race_readiness(150.0, 40.0, 10.0), 112.5);
        assert_eq!(race_readiness(150.0, 40.0, 0.0), 150.0);
    }
}
