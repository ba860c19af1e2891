//! Aggregation and pacing arithmetic over already-fetched records.

use std::collections::HashMap;
use std::hash::Hash;

use crate::models::analytics::{PacingStatus, WeeklyCapacity};
use crate::models::bucket::TimeTarget;
use crate::models::time_entry::TimeEntry;

pub const DEFAULT_AWAKE_HOURS_PER_DAY: f64 = 16.0;
pub const DEFAULT_PACING_TOLERANCE: f64 = 0.1;
const RATIO_EPSILON: f64 = 1e-9;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of `values`, one decimal. Empty input is 0.
pub fn average<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        return 0.0;
    }
    round1(sum / count as f64)
}

pub fn total_hours(entries: &[TimeEntry]) -> f64 {
    entries.iter().map(|entry| entry.hours).sum()
}

pub fn hours_by_group<K, F>(entries: &[TimeEntry], key_fn: F) -> HashMap<K, f64>
where
    K: Eq + Hash,
    F: Fn(&TimeEntry) -> K,
{
    entries.iter().fold(HashMap::new(), |mut acc, entry| {
        *acc.entry(key_fn(entry)).or_insert(0.0) += entry.hours;
        acc
    })
}

pub fn hours_by_bucket(entries: &[TimeEntry]) -> HashMap<String, f64> {
    hours_by_group(entries, |entry| entry.bucket_id.clone())
}

/// Share of available awake time spent per bucket, in percent with one decimal.
pub fn allocation_percent(
    entries: &[TimeEntry],
    awake_hours_per_day: f64,
    days: u32,
) -> HashMap<String, f64> {
    let available = awake_hours_per_day * f64::from(days);
    hours_by_bucket(entries)
        .into_iter()
        .map(|(bucket_id, hours)| {
            let percent = if available > 0.0 {
                round1(hours / available * 100.0)
            } else {
                0.0
            };
            (bucket_id, percent)
        })
        .collect()
}

pub fn target_percent_to_hours(percent: f64, awake_hours_per_day: f64, days: u32) -> f64 {
    round1(percent / 100.0 * awake_hours_per_day * f64::from(days))
}

/// Classifies `actual / target`.
///
/// Hitting the target exactly is `OnTrack`; only exceeding it is `Ahead`.
/// Both zero is `OnTrack`. A zero target with any logged time is `Ahead`.
pub fn pacing_status(actual: f64, target: f64, tolerance: f64) -> PacingStatus {
    if actual == 0.0 && target == 0.0 {
        return PacingStatus::OnTrack;
    }
    if target <= 0.0 {
        return PacingStatus::Ahead;
    }

    let ratio = actual / target;
    if ratio > 1.0 + RATIO_EPSILON {
        PacingStatus::Ahead
    } else if ratio + RATIO_EPSILON >= 1.0 - tolerance {
        PacingStatus::OnTrack
    } else if ratio + RATIO_EPSILON >= 1.0 - tolerance * 2.0 {
        PacingStatus::SlightlyBehind
    } else {
        PacingStatus::Behind
    }
}

pub fn weekly_capacity(targets: &[TimeTarget], awake_hours_per_day: f64) -> WeeklyCapacity {
    let total_percent: f64 = targets.iter().map(|target| target.target_percent).sum();
    let weekly_hours = awake_hours_per_day * 7.0;
    let allocated = total_percent / 100.0 * weekly_hours;

    WeeklyCapacity {
        allocated: round1(allocated),
        unallocated: round1(weekly_hours - allocated),
        total_percent: round1(total_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time_entry::EntryType;
    use chrono::NaiveDate;

    fn entry(bucket: &str, hours: f64) -> TimeEntry {
        TimeEntry {
            id: format!("{bucket}-{hours}"),
            user_id: "user".into(),
            bucket_id: bucket.into(),
            task_id: None,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hours,
            description: None,
            entry_type: EntryType::Manual,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn target(bucket: &str, percent: f64) -> TimeTarget {
        TimeTarget {
            id: bucket.into(),
            user_id: "user".into(),
            bucket_id: bucket.into(),
            target_percent: percent,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn average_of_empty_is_zero() {
        assert_eq!(average(Vec::<f64>::new()), 0.0);
        assert_eq!(average(vec![4.0, 6.0]), 5.0);
        assert_eq!(average(vec![7.0, 8.0, 8.0]), 7.7);
    }

    #[test]
    fn pacing_thresholds() {
        assert_eq!(pacing_status(10.0, 10.0, 0.1), PacingStatus::OnTrack);
        assert_eq!(pacing_status(9.5, 10.0, 0.1), PacingStatus::OnTrack);
        assert_eq!(pacing_status(12.0, 10.0, 0.1), PacingStatus::Ahead);
        assert_eq!(pacing_status(8.0, 10.0, 0.1), PacingStatus::SlightlyBehind);
        assert_eq!(pacing_status(5.0, 10.0, 0.1), PacingStatus::Behind);
        assert_eq!(pacing_status(0.0, 0.0, 0.1), PacingStatus::OnTrack);
        assert_eq!(pacing_status(0.0, 0.0, 0.5), PacingStatus::OnTrack);
        assert_eq!(pacing_status(3.0, 0.0, 0.1), PacingStatus::Ahead);
    }

    #[test]
    fn hours_grouped_by_bucket() {
        let entries = vec![entry("work", 2.5), entry("health", 1.0), entry("work", 1.5)];
        assert_eq!(total_hours(&entries), 5.0);

        let grouped = hours_by_bucket(&entries);
        assert_eq!(grouped.get("work"), Some(&4.0));
        assert_eq!(grouped.get("health"), Some(&1.0));

        let percent = allocation_percent(&entries, 16.0, 7);
        // 4 / 112 = 3.57%
        assert_eq!(percent.get("work"), Some(&3.6));
    }

    #[test]
    fn target_percent_converts_to_hours() {
        assert_eq!(target_percent_to_hours(25.0, 16.0, 7), 28.0);
        assert_eq!(target_percent_to_hours(10.0, 16.0, 1), 1.6);
        assert_eq!(target_percent_to_hours(0.0, 16.0, 7), 0.0);
    }

    #[test]
    fn capacity_splits_week() {
        let capacity = weekly_capacity(&[target("a", 25.0), target("b", 15.0)], 16.0);
        assert_eq!(capacity.total_percent, 40.0);
        assert_eq!(capacity.allocated, 44.8);
        assert_eq!(capacity.unallocated, 67.2);
    }
}
