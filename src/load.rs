//! Per-workout training load
//!
//! Load is `duration_minutes * intensity`. Intensity comes from, in order:
//! the platform's own strain score, a heart-rate-reserve estimate, or a
//! nominal 1.0 for sessions with no intensity data at all.

use crate::models::WorkoutRecord;
use serde::{Deserialize, Serialize};

/// Resting heart rate assumed when the athlete's own value is unknown
pub const DEFAULT_RESTING_HR: u16 = 60;

/// Age assumed for the max heart rate estimate (220 - age).
///
/// User age is not plumbed through the platform payloads, so every athlete
/// gets a max HR of 190.
pub const DEFAULT_AGE: u16 = 30;

/// Intensity used when a workout has neither strain nor heart rate
pub const NOMINAL_INTENSITY: f64 = 1.0;

/// Base offset that puts HR-derived intensity on a scale similar to strain
const HRR_INTENSITY_OFFSET: f64 = 0.5;

/// Age-predicted maximum heart rate
pub fn age_predicted_max_hr(age: u16) -> u16 {
    220u16.saturating_sub(age)
}

/// Which signal an intensity value was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensitySource {
    Strain,
    HeartRate,
    Nominal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intensity {
    pub value: f64,
    pub source: IntensitySource,
}

/// Computes intensity and training load for canonical workouts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadCalculator {
    resting_hr: f64,
    max_hr: f64,
}

impl LoadCalculator {
    /// Calculator using the fixed resting 60 / max 190 defaults
    pub fn new() -> Self {
        Self::with_heart_rate(DEFAULT_RESTING_HR, age_predicted_max_hr(DEFAULT_AGE))
    }

    pub fn with_heart_rate(resting_hr: u16, max_hr: u16) -> Self {
        LoadCalculator {
            resting_hr: f64::from(resting_hr),
            max_hr: f64::from(max_hr),
        }
    }

    /// Resolve the intensity for a workout
    pub fn intensity(&self, workout: &WorkoutRecord) -> Intensity {
        if let Some(strain) = workout.strain {
            return Intensity {
                value: strain,
                source: IntensitySource::Strain,
            };
        }

        if let Some(avg_hr) = workout.average_heart_rate {
            let reserve = self.max_hr - self.resting_hr;
            // Degenerate HR settings fall through to nominal intensity
            if reserve > 0.0 {
                let hrr = (f64::from(avg_hr) - self.resting_hr) / reserve;
                return Intensity {
                    value: HRR_INTENSITY_OFFSET + hrr,
                    source: IntensitySource::HeartRate,
                };
            }
        }

        Intensity {
            value: NOMINAL_INTENSITY,
            source: IntensitySource::Nominal,
        }
    }

    /// Training load contributed by a single workout
    pub fn workout_load(&self, workout: &WorkoutRecord) -> f64 {
        workout.duration_minutes() * self.intensity(workout).value
    }

    /// Mean load over a set of workouts, 0 when empty
    pub fn mean_load<'a, I>(&self, workouts: I) -> f64
    where
        I: IntoIterator<Item = &'a WorkoutRecord>,
    {
        let (total, count) = workouts
            .into_iter()
            .fold((0.0, 0usize), |(sum, n), w| (sum + self.workout_load(w), n + 1));

        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

impl Default for LoadCalculator {
    fn default() -> Self {
        Self::new()
    }
}
