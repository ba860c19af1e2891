use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::utils::dates::{local_date, parse_date};

/// Consecutive check-in days ending today or yesterday.
///
/// Dates may arrive in any order and repeat; each calendar day counts once.
/// Unparsable values are skipped.
pub fn calculate_streak<S: AsRef<str>>(dates: &[S], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = dates
        .iter()
        .filter_map(|value| match parse_date(value.as_ref()) {
            Ok(date) => Some(date),
            Err(_) => {
                warn!(target: "app::streak", value = value.as_ref(), "skipping unparsable check-in date");
                None
            }
        })
        .collect();

    streak_from_days(&days, today)
}

pub fn calculate_streak_in<S: AsRef<str>>(dates: &[S], tz: Tz, now: DateTime<Utc>) -> u32 {
    calculate_streak(dates, local_date(now, tz))
}

/// Same walk over already-parsed, deduplicated days. Days after `today` are
/// ignored.
pub fn streak_from_days(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut past = days.range(..=today).rev();

    let start = match past.next() {
        Some(latest) if *latest == today || *latest == yesterday => *latest,
        _ => return 0,
    };

    let mut streak = 1u32;
    let mut expected = start - Duration::days(1);
    for day in past {
        if *day != expected {
            break;
        }
        streak += 1;
        expected = expected - Duration::days(1);
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn days_ago(n: i64) -> String {
        (today() - Duration::days(n)).format("%Y-%m-%d").to_string()
    }

    #[test]
    fn empty_input_has_no_streak() {
        let dates: Vec<String> = Vec::new();
        assert_eq!(calculate_streak(&dates, today()), 0);
    }

    #[test]
    fn counts_consecutive_days_ending_today() {
        let dates = vec![days_ago(0), days_ago(1), days_ago(2)];
        assert_eq!(calculate_streak(&dates, today()), 3);
    }

    #[test]
    fn streak_may_end_yesterday() {
        let dates = vec![days_ago(1), days_ago(2)];
        assert_eq!(calculate_streak(&dates, today()), 2);
    }

    #[test]
    fn missed_day_before_yesterday_breaks_streak() {
        let dates = vec![days_ago(2)];
        assert_eq!(calculate_streak(&dates, today()), 0);
    }

    #[test]
    fn gap_stops_the_walk() {
        let dates = vec![days_ago(0), days_ago(1), days_ago(3), days_ago(4)];
        assert_eq!(calculate_streak(&dates, today()), 2);
    }

    #[test]
    fn duplicates_and_order_do_not_matter() {
        let dates = vec![
            days_ago(2),
            days_ago(0),
            days_ago(1),
            days_ago(0),
            days_ago(1),
            "not-a-date".to_string(),
        ];
        assert_eq!(calculate_streak(&dates, today()), 3);
    }

    #[test]
    fn days_after_today_are_ignored() {
        let tomorrow = (today() + Duration::days(1)).format("%Y-%m-%d").to_string();
        let dates = vec![days_ago(2), days_ago(1), days_ago(0), tomorrow];
        assert_eq!(calculate_streak(&dates, today()), 3);
    }

    #[test]
    fn today_is_resolved_in_user_timezone() {
        // 03:00 UTC on the 16th is still the 15th in Los Angeles.
        let now = Utc.with_ymd_and_hms(2024, 6, 16, 3, 0, 0).unwrap();
        let dates = vec![days_ago(1), days_ago(0)];
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        assert_eq!(calculate_streak_in(&dates, tz, now), 2);
    }
}
