use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::analytics::{
    BucketTimeData, DailyPoint, GoalProgress, MeasureTrend, TimeAllocationSummary, TrendDirection,
    WeekHours,
};
use crate::models::bucket::{Bucket, TimeTarget};
use crate::models::check_in::{CheckInResponse, Measure, MeasureType};
use crate::models::goal::{Goal, GoalCheckInLog};
use crate::models::time_entry::TimeEntry;
use crate::services::metrics::{average, round1};
use crate::utils::dates::{iso_week_key, window_start};

pub const TREND_MARGIN: f64 = 0.3;
pub const MIN_TREND_POINTS: usize = 4;
pub const ALLOCATION_ALERT_POINTS: f64 = 10.0;

/// Values inside `[today - (days - 1), today]`, one point per day in date
/// order. Days without data are absent rather than zero; several values on
/// the same day are averaged.
pub fn daily_series(values: &[(NaiveDate, f64)], today: NaiveDate, days: u32) -> Vec<DailyPoint> {
    let start = window_start(today, days);
    let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (date, value) in values {
        if *date < start || *date > today {
            continue;
        }
        let slot = by_day.entry(*date).or_insert((0.0, 0));
        slot.0 += value;
        slot.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (sum, count))| DailyPoint {
            date,
            value: sum / count as f64,
        })
        .collect()
}

/// First-half mean against second-half mean, split at `len / 2`.
pub fn trend_direction(values: &[f64]) -> TrendDirection {
    if values.len() < MIN_TREND_POINTS {
        return TrendDirection::Flat;
    }

    let midpoint = values.len() / 2;
    let (first, second) = values.split_at(midpoint);
    let first_mean = first.iter().sum::<f64>() / first.len() as f64;
    let second_mean = second.iter().sum::<f64>() / second.len() as f64;

    if second_mean > first_mean + TREND_MARGIN {
        TrendDirection::Up
    } else if second_mean < first_mean - TREND_MARGIN {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

pub fn measure_trend(
    measure: &Measure,
    responses: &[CheckInResponse],
    today: NaiveDate,
    days: u32,
) -> MeasureTrend {
    let start = window_start(today, days);
    let in_window: Vec<&CheckInResponse> = responses
        .iter()
        .filter(|response| response.measure_id == measure.id)
        .filter(|response| response.check_in_date >= start && response.check_in_date <= today)
        .collect();

    let points: Vec<(NaiveDate, f64)> = in_window
        .iter()
        .map(|response| (response.check_in_date, response.score))
        .collect();
    let daily = daily_series(&points, today, days);
    let trend = trend_direction(&daily.iter().map(|point| point.value).collect::<Vec<_>>());

    let is_binary = measure.measure_type == MeasureType::Binary;
    let check_in_count = in_window.len();
    let yes_count = if is_binary {
        in_window.iter().filter(|response| response.score == 1.0).count()
    } else {
        0
    };
    let completion_rate = if is_binary && check_in_count > 0 {
        (yes_count as f64 / check_in_count as f64 * 100.0).round()
    } else {
        0.0
    };

    MeasureTrend {
        measure_id: measure.id.clone(),
        question_text: measure.question_text.clone(),
        is_binary,
        // Binary measures average their 0/1 encoding; yes_count carries the tally.
        average: average(in_window.iter().map(|response| response.score)),
        completion_rate,
        yes_count,
        check_in_count,
        trend,
        daily,
    }
}

/// Progress of a measure-linked goal from its check-in logs.
///
/// Binary goals count yes answers; scale goals average the values. Progress
/// is capped at 100 and is 0 without a target.
pub fn goal_progress(goal: &Goal, logs: &[GoalCheckInLog], is_binary: bool) -> GoalProgress {
    let mut logs: Vec<&GoalCheckInLog> = logs.iter().filter(|log| log.goal_id == goal.id).collect();
    logs.sort_by_key(|log| log.log_date);

    let current_value = if is_binary {
        logs.iter().filter(|log| log.value == 1.0).count() as f64
    } else {
        average(logs.iter().map(|log| log.value))
    };

    let progress_percent = match goal.target_value {
        Some(target) if target > 0.0 => (current_value / target * 100.0).min(100.0),
        _ => 0.0,
    };

    let values: Vec<f64> = logs.iter().map(|log| log.value).collect();

    GoalProgress {
        goal: goal.clone(),
        is_binary,
        current_value,
        target_value: goal.target_value,
        progress_percent,
        log_count: logs.len(),
        trend: trend_direction(&values),
    }
}

/// Time split across buckets over the last `days` days, measured against
/// logged time rather than awake time.
pub fn time_allocation_summary(
    buckets: &[Bucket],
    targets: &[TimeTarget],
    entries: &[TimeEntry],
    today: NaiveDate,
    days: u32,
) -> TimeAllocationSummary {
    let start = window_start(today, days);
    let entries: Vec<&TimeEntry> = entries
        .iter()
        .filter(|entry| entry.entry_date >= start && entry.entry_date <= today)
        .collect();

    let total: f64 = entries.iter().map(|entry| entry.hours).sum();
    let target_map: HashMap<&str, f64> = targets
        .iter()
        .map(|target| (target.bucket_id.as_str(), target.target_percent))
        .collect();

    let mut bucket_rows: Vec<BucketTimeData> = buckets
        .iter()
        .map(|bucket| {
            let mut weekly: BTreeMap<String, f64> = BTreeMap::new();
            let mut hours = 0.0;
            for entry in entries.iter().filter(|entry| entry.bucket_id == bucket.id) {
                hours += entry.hours;
                *weekly.entry(iso_week_key(entry.entry_date)).or_insert(0.0) += entry.hours;
            }

            let target_percent = target_map.get(bucket.id.as_str()).copied();
            let actual_percent = if total > 0.0 { hours / total * 100.0 } else { 0.0 };
            let difference = target_percent
                .map(|target| actual_percent - target)
                .unwrap_or(0.0);

            BucketTimeData {
                bucket: bucket.clone(),
                total_hours: round1(hours),
                target_percent,
                actual_percent: round1(actual_percent),
                difference: round1(difference),
                weekly: weekly
                    .into_iter()
                    .map(|(week, hours)| WeekHours { week, hours })
                    .collect(),
            }
        })
        .filter(|row| row.total_hours > 0.0 || row.target_percent.is_some())
        .collect();
    bucket_rows.sort_by(|a, b| {
        b.total_hours
            .partial_cmp(&a.total_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut daily_totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for entry in &entries {
        *daily_totals.entry(entry.entry_date).or_insert(0.0) += entry.hours;
    }

    let alerts = bucket_rows
        .iter()
        .filter(|row| row.target_percent.is_some() && row.difference.abs() > ALLOCATION_ALERT_POINTS)
        .cloned()
        .collect();

    TimeAllocationSummary {
        days_back: days,
        total_hours: round1(total),
        avg_per_day: if total > 0.0 && days > 0 {
            round1(total / f64::from(days))
        } else {
            0.0
        },
        days_tracked: daily_totals.len(),
        buckets: bucket_rows,
        daily: daily_totals
            .into_iter()
            .map(|(date, value)| DailyPoint { date, value })
            .collect(),
        alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::goal::GoalStatus;
    use crate::models::task::Priority;
    use crate::models::time_entry::EntryType;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    fn measure(kind: MeasureType) -> Measure {
        Measure {
            id: "m1".into(),
            user_id: "u".into(),
            question_text: "Slept well?".into(),
            measure_type: kind,
            baseline_score: None,
            target_score: None,
            is_active: true,
            sort_order: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn response(days_ago: i64, score: f64) -> CheckInResponse {
        CheckInResponse {
            id: format!("r{days_ago}"),
            user_id: "u".into(),
            measure_id: "m1".into(),
            check_in_date: today() - Duration::days(days_ago),
            score,
            notes: None,
            created_at: String::new(),
        }
    }

    fn goal(target: Option<f64>) -> Goal {
        Goal {
            id: "g1".into(),
            user_id: "u".into(),
            bucket_id: "b1".into(),
            parent_goal_id: None,
            measure_id: Some("m1".into()),
            title: "Sleep".into(),
            description: None,
            status: GoalStatus::InProgress,
            priority: Priority::Medium,
            progress_percent: 0,
            target_date: None,
            completed_date: None,
            target_value: target,
            target_type: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn log(days_ago: i64, value: f64) -> GoalCheckInLog {
        GoalCheckInLog {
            id: format!("l{days_ago}"),
            user_id: "u".into(),
            goal_id: "g1".into(),
            response_id: format!("r{days_ago}"),
            log_date: today() - Duration::days(days_ago),
            value,
            created_at: String::new(),
        }
    }

    fn bucket(id: &str) -> Bucket {
        Bucket {
            id: id.into(),
            user_id: "u".into(),
            name: id.into(),
            description: None,
            parent_bucket_id: None,
            color: "#6366f1".into(),
            icon: None,
            sort_order: 0,
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn entry(bucket: &str, days_ago: i64, hours: f64) -> TimeEntry {
        TimeEntry {
            id: format!("{bucket}-{days_ago}"),
            user_id: "u".into(),
            bucket_id: bucket.into(),
            task_id: None,
            entry_date: today() - Duration::days(days_ago),
            hours,
            description: None,
            entry_type: EntryType::Manual,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn trend_labels_follow_margin() {
        let rising = [5.0, 5.0, 5.0, 5.0, 5.5, 5.5, 5.5, 5.5];
        assert_eq!(trend_direction(&rising), TrendDirection::Up);

        let barely = [5.0, 5.0, 5.0, 5.0, 5.1, 5.1, 5.1, 5.1];
        assert_eq!(trend_direction(&barely), TrendDirection::Flat);

        let falling = [8.0, 8.0, 6.0, 6.0];
        assert_eq!(trend_direction(&falling), TrendDirection::Down);

        assert_eq!(trend_direction(&[1.0, 9.0, 9.0]), TrendDirection::Flat);
    }

    #[test]
    fn series_leaves_missing_days_absent() {
        let values = vec![
            (today(), 7.0),
            (today() - Duration::days(3), 5.0),
            (today() - Duration::days(10), 9.0),
        ];
        let series = daily_series(&values, today(), 7);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, today() - Duration::days(3));
        assert_eq!(series[1].value, 7.0);
    }

    #[test]
    fn binary_measure_reports_completion_rate() {
        let responses = vec![response(0, 1.0), response(1, 0.0), response(2, 1.0), response(40, 1.0)];
        let trend = measure_trend(&measure(MeasureType::Binary), &responses, today(), 30);
        assert!(trend.is_binary);
        assert_eq!(trend.check_in_count, 3);
        assert_eq!(trend.yes_count, 2);
        assert_eq!(trend.completion_rate, 67.0);
        assert_eq!(trend.average, 0.7);
        assert_eq!(trend.daily.len(), 3);
    }

    #[test]
    fn scale_measure_trends_up() {
        let responses: Vec<_> = (0..8)
            .map(|i| response(i, if i < 4 { 8.0 } else { 6.0 }))
            .collect();
        let trend = measure_trend(&measure(MeasureType::Scale), &responses, today(), 7);
        // day 7 falls outside a 7-day window
        assert_eq!(trend.check_in_count, 7);
        assert_eq!(trend.trend, TrendDirection::Up);
        assert_eq!(trend.completion_rate, 0.0);
    }

    #[test]
    fn goal_progress_counts_or_averages() {
        let logs = vec![log(3, 1.0), log(2, 0.0), log(1, 1.0), log(0, 1.0)];
        let binary = goal_progress(&goal(Some(2.0)), &logs, true);
        assert_eq!(binary.current_value, 3.0);
        assert_eq!(binary.progress_percent, 100.0);

        let scale_logs = vec![log(1, 7.0), log(0, 8.0)];
        let scale = goal_progress(&goal(Some(10.0)), &scale_logs, false);
        assert_eq!(scale.current_value, 7.5);
        assert_eq!(scale.progress_percent, 75.0);
        assert_eq!(scale.log_count, 2);

        let untargeted = goal_progress(&goal(None), &scale_logs, false);
        assert_eq!(untargeted.progress_percent, 0.0);
    }

    #[test]
    fn allocation_summary_flags_drift() {
        let buckets = vec![bucket("work"), bucket("health"), bucket("idle")];
        let targets = vec![TimeTarget {
            id: "t".into(),
            user_id: "u".into(),
            bucket_id: "health".into(),
            target_percent: 50.0,
            created_at: String::new(),
            updated_at: String::new(),
        }];
        let entries = vec![
            entry("work", 0, 6.0),
            entry("work", 1, 2.0),
            entry("health", 1, 2.0),
            entry("work", 45, 9.0),
        ];

        let summary = time_allocation_summary(&buckets, &targets, &entries, today(), 7);
        assert_eq!(summary.total_hours, 10.0);
        assert_eq!(summary.days_tracked, 2);
        assert_eq!(summary.avg_per_day, 1.4);
        assert_eq!(summary.buckets.len(), 2);
        assert_eq!(summary.buckets[0].bucket.id, "work");
        assert_eq!(summary.buckets[0].actual_percent, 80.0);

        assert_eq!(summary.alerts.len(), 1);
        assert_eq!(summary.alerts[0].bucket.id, "health");
        assert_eq!(summary.alerts[0].difference, -30.0);
    }
}
