use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Added to every time-to-rollover so the divisor can never reach zero.
    pub const MONTH_ROLLOVER_EPSILON_SECS: f64 = 1.0;
}

/// Midnight on day 1 of the month after `now`. December rolls into January of the next year.
pub fn start_of_next_month(now: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Seconds until the quota window rolls over, plus [`TimeUtils::MONTH_ROLLOVER_EPSILON_SECS`].
/// Always strictly positive.
pub fn seconds_left_in_month(now: NaiveDateTime) -> f64 {
    let time_to_next_month = start_of_next_month(now) - now;
    let secs = time_to_next_month.num_milliseconds() as f64 / TimeUtils::MS_IN_S as f64;
    secs.max(0.0) + TimeUtils::MONTH_ROLLOVER_EPSILON_SECS
}

/// Operator's wall clock. The quota window follows local calendar months.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn now_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse an API timestamp such as `2024-03-01T12:00:05.123Z` into epoch milliseconds.
pub fn rfc3339_to_epoch_ms(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

pub fn format_duration(ms: i64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m {}s", mins, secs % 60);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h {}m", hours, mins % 60);
    }
    let days = hours / 24;
    format!("{}d {}h", days, hours % 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_next_month_mid_year() {
        assert_eq!(start_of_next_month(at(2024, 6, 15, 8, 30, 0)), at(2024, 7, 1, 0, 0, 0));
    }

    #[test]
    fn test_next_month_rolls_year() {
        assert_eq!(start_of_next_month(at(2023, 12, 5, 0, 0, 0)), at(2024, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_last_second_of_year_is_small_and_positive() {
        let left = seconds_left_in_month(at(2023, 12, 31, 23, 59, 59));
        assert_eq!(left, 1.0 + TimeUtils::MONTH_ROLLOVER_EPSILON_SECS);
    }

    #[test]
    fn test_exact_month_boundary_is_full_month() {
        // 2024-02-01 00:00:00 -> 2024-03-01 00:00:00 is 29 days (leap year)
        let left = seconds_left_in_month(at(2024, 2, 1, 0, 0, 0));
        assert_eq!(left, 29.0 * 86_400.0 + TimeUtils::MONTH_ROLLOVER_EPSILON_SECS);
    }

    #[test]
    fn test_sub_second_precision_kept() {
        let now = at(2024, 4, 30, 23, 59, 59) + chrono::Duration::milliseconds(500);
        let left = seconds_left_in_month(now);
        assert!((left - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_rfc3339_parse() {
        assert_eq!(rfc3339_to_epoch_ms("1970-01-01T00:00:01.500Z"), Some(1_500));
        assert_eq!(rfc3339_to_epoch_ms("not a date"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(2_000), "2s");
        assert_eq!(format_duration(256_000), "4m 16s");
        assert_eq!(format_duration(TimeUtils::MS_IN_D * 3 + TimeUtils::MS_IN_H * 5), "3d 5h");
    }

    proptest! {
        #[test]
        fn prop_seconds_left_always_positive(
            year in 1970i32..2200,
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
            second in 0u32..60,
        ) {
            let now = at(year, month, day, hour, minute, second);
            let left = seconds_left_in_month(now);
            prop_assert!(left >= TimeUtils::MONTH_ROLLOVER_EPSILON_SECS);
            // Never more than the longest month plus epsilon
            prop_assert!(left <= 31.0 * 86_400.0 + TimeUtils::MONTH_ROLLOVER_EPSILON_SECS);
        }
    }
}
