//! Cross-platform workout deduplication
//!
//! The same run is often reported by a watch vendor and a phone app. Records
//! are considered the same physical workout when they share the hour they
//! started in, their activity type and their exact duration. The surviving
//! record is the one from the highest-priority source; on equal priority the
//! first one seen is kept.

use crate::models::WorkoutRecord;
use std::collections::HashMap;
use tracing::debug;

const SECONDS_PER_HOUR: i64 = 3600;

/// Composite identity of a physical workout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Start time as whole hours since the Unix epoch, rounded down
    pub hour: i64,
    pub activity_type: String,
    pub duration_ms: u64,
}

/// Outcome of a deduplication pass
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub retained: Vec<WorkoutRecord>,
    /// Records that lost a collision, either on arrival or after being replaced
    pub discarded: usize,
}

/// Build the dedup key for a workout
pub fn dedup_key(workout: &WorkoutRecord) -> DedupKey {
    DedupKey {
        hour: workout.timestamp.timestamp().div_euclid(SECONDS_PER_HOUR),
        activity_type: workout.activity_type.clone(),
        duration_ms: workout.duration_ms,
    }
}

/// Collapse duplicate workouts, keeping the highest-priority source
pub fn deduplicate(workouts: Vec<WorkoutRecord>) -> Vec<WorkoutRecord> {
    deduplicate_with_report(workouts).retained
}

/// Same as [`deduplicate`], also reporting how many records were dropped
///
/// Retained records come out in the order their key was first seen.
pub fn deduplicate_with_report(workouts: Vec<WorkoutRecord>) -> DedupOutcome {
    let mut slots: HashMap<DedupKey, usize> = HashMap::with_capacity(workouts.len());
    let mut retained: Vec<WorkoutRecord> = Vec::with_capacity(workouts.len());
    let mut discarded = 0;

    for workout in workouts {
        let key = dedup_key(&workout);

        match slots.get(&key) {
            Some(&index) => {
                let current = &retained[index];
                if workout.source.priority() > current.source.priority() {
                    debug!(
                        replaced = %current.source,
                        winner = %workout.source,
                        started = %current.timestamp,
                        "Duplicate workout replaced by higher-priority source"
                    );
                    retained[index] = workout;
                }
                discarded += 1;
            }
            None => {
                slots.insert(key, retained.len());
                retained.push(workout);
            }
        }
    }

    DedupOutcome {
        retained,
        discarded,
    }
}
