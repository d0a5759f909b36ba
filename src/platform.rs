//! Platform payloads and their normalization into canonical records
//!
//! The sync layer stores one JSON object per user, keyed by platform name.
//! Each known platform gets a typed payload struct and an explicit
//! normalization function. Unknown keys in the object (for example
//! `lastSync`) are ignored.

use crate::error::{IngestError, Result};
use crate::models::{RecoveryRecord, SleepRecord, Source, WorkoutRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Activity type used when a platform reports none
pub const DEFAULT_ACTIVITY_TYPE: &str = "workout";

/// Platforms whose payloads the engine knows how to normalize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Whoop,
    Strava,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Whoop, Platform::Strava];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Whoop => "whoop",
            Platform::Strava => "strava",
        }
    }

    /// Source tag stamped on workouts from this platform
    pub fn source(&self) -> Source {
        match self {
            Platform::Whoop => Source::Whoop,
            Platform::Strava => Source::Strava,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = IngestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whoop" => Ok(Platform::Whoop),
            "strava" => Ok(Platform::Strava),
            other => Err(IngestError::UnsupportedPlatform {
                name: other.to_string(),
            }),
        }
    }
}

/// `{ "records": [...] }` wrapper used by every platform collection
///
/// Decoding never fails. A null, missing or non-array `records` reads as
/// empty, and entries that do not decode as `T` are dropped and counted in
/// `rejected`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSet<T> {
    pub records: Vec<T>,

    #[serde(skip)]
    pub rejected: usize,
}

impl<T> Default for RecordSet<T> {
    fn default() -> Self {
        RecordSet {
            records: Vec::new(),
            rejected: 0,
        }
    }
}

impl<T: DeserializeOwned> RecordSet<T> {
    fn from_raw(raw: Value) -> Self {
        let entries = match raw {
            Value::Object(mut fields) => match fields.remove("records") {
                Some(Value::Array(entries)) => entries,
                None | Some(Value::Null) => Vec::new(),
                Some(other) => {
                    warn!(found = %json_kind(&other), "Ignoring non-array records");
                    Vec::new()
                }
            },
            Value::Null => Vec::new(),
            other => {
                warn!(found = %json_kind(&other), "Ignoring record collection that is not an object");
                Vec::new()
            }
        };

        let mut set = RecordSet::default();
        for entry in entries {
            match serde_json::from_value::<T>(entry) {
                Ok(record) => set.records.push(record),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed record");
                    set.rejected += 1;
                }
            }
        }
        set
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for RecordSet<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(RecordSet::from_raw)
    }
}

/// Decode one platform section, treating an unreadable section as absent
fn lenient_platform<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => {
            let found = json_kind(&raw);
            match serde_json::from_value(raw) {
                Ok(data) => Ok(Some(data)),
                Err(e) => {
                    warn!(found, error = %e, "Ignoring unreadable platform payload");
                    Ok(None)
                }
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Per-user platform payload as persisted by the sync layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformData {
    #[serde(
        default,
        deserialize_with = "lenient_platform",
        skip_serializing_if = "Option::is_none"
    )]
    pub whoop: Option<WhoopData>,

    #[serde(
        default,
        deserialize_with = "lenient_platform",
        skip_serializing_if = "Option::is_none"
    )]
    pub strava: Option<StravaData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workouts: Option<RecordSet<WhoopWorkout>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery: Option<RecordSet<WhoopRecovery>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep: Option<RecordSet<WhoopSleep>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopWorkout {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub score: Option<WhoopWorkoutScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopWorkoutScore {
    #[serde(default)]
    pub strain: Option<f64>,
    #[serde(default)]
    pub average_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
    #[serde(default)]
    pub distance_meter: Option<f64>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopRecovery {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub score: Option<WhoopRecoveryScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopRecoveryScore {
    #[serde(default)]
    pub recovery_score: Option<f64>,
    #[serde(default)]
    pub strain: Option<f64>,
    #[serde(default)]
    pub hrv: Option<f64>,
    #[serde(default)]
    pub hrv_rmssd: Option<f64>,
    #[serde(default)]
    pub resting_heart_rate: Option<f64>,
    #[serde(default)]
    pub sleep_quality: Option<f64>,
}

impl WhoopRecoveryScore {
    /// HRV under either field name the WHOOP payloads have used
    pub fn hrv_ms(&self) -> Option<f64> {
        self.hrv.or(self.hrv_rmssd)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopSleep {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub score: Option<WhoopSleepScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoopSleepScore {
    #[serde(default)]
    pub sleep_quality: Option<f64>,
    #[serde(default)]
    pub total_sleep_ms: Option<f64>,
    #[serde(default)]
    pub sleep_needed_ms: Option<f64>,
    #[serde(default)]
    pub sleep_debt_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StravaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<RecordSet<StravaActivity>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StravaActivity {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
}

/// Canonical records gathered from every platform in a payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedData {
    pub workouts: Vec<WorkoutRecord>,
    /// Recovery records in payload order
    pub recovery: Vec<RecoveryRecord>,
    pub sleep: Vec<SleepRecord>,
    /// Records dropped for an unreadable shape or timestamp
    pub skipped: usize,
}

impl PlatformData {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Platforms present in this payload
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| match p {
                Platform::Whoop => self.whoop.is_some(),
                Platform::Strava => self.strava.is_some(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms().is_empty()
    }

    /// Normalize every present platform into canonical records
    pub fn normalize(&self) -> NormalizedData {
        let mut out = NormalizedData::default();

        for platform in self.platforms() {
            match platform {
                Platform::Whoop => {
                    if let Some(whoop) = &self.whoop {
                        normalize_whoop(whoop, &mut out);
                    }
                }
                Platform::Strava => {
                    if let Some(strava) = &self.strava {
                        normalize_strava(strava, &mut out);
                    }
                }
            }
        }

        debug!(
            workouts = out.workouts.len(),
            recovery = out.recovery.len(),
            sleep = out.sleep.len(),
            skipped = out.skipped,
            "Normalized platform data"
        );

        out
    }
}

fn normalize_whoop(data: &WhoopData, out: &mut NormalizedData) {
    let platform = Platform::Whoop;
    out.skipped += rejected(&data.workouts) + rejected(&data.recovery) + rejected(&data.sleep);

    for workout in records(&data.workouts) {
        let Some(timestamp) = checked_timestamp(platform, "workouts", &workout.timestamp, out) else {
            continue;
        };
        let score = workout.score.clone().unwrap_or_default();

        out.workouts.push(WorkoutRecord {
            timestamp,
            activity_type: activity_type(&workout.sport),
            duration_ms: duration_ms(workout.duration_ms),
            source: platform.source(),
            // WHOOP always scores a workout; a missing or zero strain reads as nominal effort
            strain: Some(score.strain.filter(|s| *s > 0.0).unwrap_or(1.0)),
            average_heart_rate: heart_rate(score.average_heart_rate),
            max_heart_rate: heart_rate(score.max_heart_rate),
            distance_meters: distance(score.distance_meter),
        });
    }

    for recovery in records(&data.recovery) {
        let Some(timestamp) = checked_timestamp(platform, "recovery", &recovery.timestamp, out) else {
            continue;
        };
        let score = recovery.score.clone().unwrap_or_default();

        out.recovery.push(RecoveryRecord {
            date: timestamp.date_naive(),
            hrv: score.hrv_ms().unwrap_or(0.0),
            resting_heart_rate: score.resting_heart_rate.unwrap_or(0.0),
            sleep_quality: score.sleep_quality.unwrap_or(0.0),
        });
    }

    for sleep in records(&data.sleep) {
        let Some(timestamp) = checked_timestamp(platform, "sleep", &sleep.timestamp, out) else {
            continue;
        };
        let score = sleep.score.clone().unwrap_or_default();

        out.sleep.push(SleepRecord {
            timestamp,
            sleep_quality: score.sleep_quality.unwrap_or(0.0),
            total_sleep_ms: score.total_sleep_ms.unwrap_or(0.0),
            sleep_needed_ms: score.sleep_needed_ms.unwrap_or(0.0),
            sleep_debt_ms: score.sleep_debt_ms.unwrap_or(0.0),
        });
    }
}

fn normalize_strava(data: &StravaData, out: &mut NormalizedData) {
    let platform = Platform::Strava;
    out.skipped += rejected(&data.activities);

    for activity in records(&data.activities) {
        let Some(timestamp) = checked_timestamp(platform, "activities", &activity.timestamp, out)
        else {
            continue;
        };

        out.workouts.push(WorkoutRecord {
            timestamp,
            activity_type: activity_type(&activity.sport),
            duration_ms: duration_ms(activity.duration_ms),
            source: platform.source(),
            strain: None,
            average_heart_rate: heart_rate(activity.average_heartrate),
            max_heart_rate: heart_rate(activity.max_heartrate),
            distance_meters: distance(activity.distance_meters),
        });
    }
}

fn records<T>(set: &Option<RecordSet<T>>) -> &[T] {
    set.as_ref().map(|s| s.records.as_slice()).unwrap_or(&[])
}

fn rejected<T>(set: &Option<RecordSet<T>>) -> usize {
    set.as_ref().map_or(0, |s| s.rejected)
}

fn checked_timestamp(
    platform: Platform,
    category: &str,
    raw: &Option<Value>,
    out: &mut NormalizedData,
) -> Option<DateTime<Utc>> {
    let result = match raw {
        Some(value) => parse_timestamp(platform, value),
        None => Err(IngestError::MissingTimestamp {
            platform: platform.to_string(),
            category: category.to_string(),
        }),
    };

    match result {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(%platform, category, error = %e, "Skipping record");
            out.skipped += 1;
            None
        }
    }
}

/// Parse an RFC 3339 string, a bare date/datetime string, or epoch milliseconds
pub fn parse_timestamp(platform: Platform, value: &Value) -> std::result::Result<DateTime<Utc>, IngestError> {
    let invalid = || IngestError::InvalidTimestamp {
        platform: platform.to_string(),
        value: value.to_string(),
    };

    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Ok(ts.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Ok(naive.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(invalid)
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(invalid),
        Value::Null => Err(IngestError::MissingTimestamp {
            platform: platform.to_string(),
            category: "record".to_string(),
        }),
        _ => Err(invalid()),
    }
}

fn activity_type(sport: &Option<String>) -> String {
    sport
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ACTIVITY_TYPE)
        .to_string()
}

fn duration_ms(raw: Option<f64>) -> u64 {
    match raw {
        Some(ms) if ms.is_finite() && ms > 0.0 => ms.round() as u64,
        _ => 0,
    }
}

fn heart_rate(raw: Option<f64>) -> Option<u16> {
    raw.filter(|hr| hr.is_finite() && *hr > 0.0)
        .map(|hr| hr.round().min(f64::from(u16::MAX)) as u16)
}

fn distance(raw: Option<f64>) -> Option<f64> {
    raw.filter(|d| d.is_finite() && *d >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_platform_parsing() {
        assert_eq!("WHOOP".parse::<Platform>().unwrap(), Platform::Whoop);
        assert_eq!(
            "polar".parse::<Platform>().unwrap_err(),
            IngestError::UnsupportedPlatform {
                name: "polar".to_string()
            }
        );
    }

    #[test]
    fn test_empty_payload() {
        let data = PlatformData::from_json("{}").unwrap();
        assert!(data.is_empty());
        assert_eq!(data.normalize(), NormalizedData::default());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let data = PlatformData::from_value(json!({
            "lastSync": "2024-01-15T10:00:00Z",
            "garmin": {"workouts": {"records": []}},
            "strava": {}
        }))
        .unwrap();
        assert_eq!(data.platforms(), vec![Platform::Strava]);
    }

    #[test]
    fn test_whoop_normalization() {
        let data = PlatformData::from_value(json!({
            "whoop": {
                "workouts": {"records": [
                    {"timestamp": "2024-01-14T07:15:00Z", "sport": "running", "duration_ms": 2_700_000,
                     "score": {"strain": 11.2, "average_heart_rate": 151}},
                    {"timestamp": "2024-01-13T07:15:00Z", "duration_ms": 600_000}
                ]},
                "recovery": {"records": [
                    {"timestamp": "2024-01-15T08:00:00Z",
                     "score": {"hrv_rmssd": 65.0, "resting_heart_rate": 48, "sleep_quality": 90}}
                ]},
                "sleep": {"records": [
                    {"timestamp": "2024-01-15T06:00:00Z",
                     "score": {"sleep_quality": 88, "total_sleep_ms": 27_000_000}}
                ]}
            }
        }))
        .unwrap();

        let normalized = data.normalize();
        assert_eq!(normalized.workouts.len(), 2);

        let run = &normalized.workouts[0];
        assert_eq!(run.activity_type, "running");
        assert_eq!(run.source, Source::Whoop);
        assert_eq!(run.strain, Some(11.2));
        assert_eq!(run.average_heart_rate, Some(151));

        let unscored = &normalized.workouts[1];
        assert_eq!(unscored.activity_type, DEFAULT_ACTIVITY_TYPE);
        assert_eq!(unscored.strain, Some(1.0));

        let recovery = &normalized.recovery[0];
        assert_eq!(recovery.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(recovery.hrv, 65.0);
        assert_eq!(recovery.resting_heart_rate, 48.0);

        assert_eq!(normalized.sleep[0].sleep_debt_ms, 0.0);
        assert_eq!(normalized.sleep[0].total_sleep_ms, 27_000_000.0);
    }

    #[test]
    fn test_strava_normalization() {
        let data = PlatformData::from_value(json!({
            "strava": {"activities": {"records": [
                {"timestamp": 1_705_302_000_000i64, "sport": "ride", "duration_ms": 5_400_000.4,
                 "average_heartrate": 141.6, "max_heartrate": 172.0, "distance_meters": 42_195.0}
            ]}}
        }))
        .unwrap();

        let workout = &data.normalize().workouts[0];
        assert_eq!(workout.timestamp, Utc.timestamp_millis_opt(1_705_302_000_000).unwrap());
        assert_eq!(workout.source, Source::Strava);
        assert_eq!(workout.duration_ms, 5_400_000);
        assert_eq!(workout.strain, None);
        assert_eq!(workout.average_heart_rate, Some(142));
        assert_eq!(workout.distance_meters, Some(42_195.0));
    }

    #[test]
    fn test_bad_timestamps_skipped() {
        let data = PlatformData::from_value(json!({
            "strava": {"activities": {"records": [
                {"sport": "run", "duration_ms": 1000},
                {"timestamp": "last tuesday", "sport": "run"},
                {"timestamp": true, "sport": "run"},
                {"timestamp": "2024-01-15", "sport": "run"}
            ]}}
        }))
        .unwrap();

        let normalized = data.normalize();
        assert_eq!(normalized.skipped, 3);
        assert_eq!(normalized.workouts.len(), 1);
        assert_eq!(
            normalized.workouts[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_offsets() {
        let ts = parse_timestamp(Platform::Whoop, &json!("2024-01-15T01:30:00-08:00")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap());

        let ts = parse_timestamp(Platform::Whoop, &json!("2024-01-15T01:30:00.250")).unwrap();
        assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_negative_duration_clamped() {
        assert_eq!(duration_ms(Some(-5.0)), 0);
        assert_eq!(duration_ms(Some(f64::NAN)), 0);
        assert_eq!(duration_ms(None), 0);
    }

    #[test]
    fn test_malformed_record_dropped_alone() {
        let data = PlatformData::from_value(json!({
            "strava": {"activities": {"records": [
                {"timestamp": "2024-01-15", "duration_ms": "long"},
                {"timestamp": "2024-01-15", "sport": 7},
                "not a record",
                {"timestamp": "2024-01-15", "sport": "run", "duration_ms": 1000}
            ]}}
        }))
        .unwrap();

        let normalized = data.normalize();
        assert_eq!(normalized.skipped, 3);
        assert_eq!(normalized.workouts.len(), 1);
        assert_eq!(normalized.workouts[0].activity_type, "run");
    }

    #[test]
    fn test_null_or_misshapen_records_read_as_empty() {
        let data = PlatformData::from_value(json!({
            "whoop": {
                "workouts": {"records": null},
                "sleep": {"records": {"0": {}}},
                "recovery": {"records": [
                    {"timestamp": "2024-01-15T08:00:00Z", "score": {"hrv": 60}}
                ]}
            },
            "strava": {"activities": null}
        }))
        .unwrap();

        let normalized = data.normalize();
        assert!(normalized.workouts.is_empty());
        assert!(normalized.sleep.is_empty());
        assert_eq!(normalized.recovery.len(), 1);
        assert_eq!(normalized.skipped, 0);
        assert_eq!(data.platforms(), vec![Platform::Whoop, Platform::Strava]);
    }

    #[test]
    fn test_unreadable_platform_is_absent() {
        let data = PlatformData::from_value(json!({
            "whoop": "disconnected",
            "strava": {"activities": {"records": [
                {"timestamp": "2024-01-15", "sport": "run", "duration_ms": 1000}
            ]}}
        }))
        .unwrap();

        assert!(data.whoop.is_none());
        assert_eq!(data.platforms(), vec![Platform::Strava]);
        assert_eq!(data.normalize().workouts.len(), 1);

        let data = PlatformData::from_value(json!({"whoop": null, "strava": 42})).unwrap();
        assert!(data.is_empty());
    }
}
