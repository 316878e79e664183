//! Daily check scheduling.

use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Parse a `HH:MM:SS` (or `HH:MM`) time of day.
pub fn parse_check_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

/// Next moment strictly after `now` whose time of day is `at`.
pub fn next_check(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Wait from `now` until the next check.
pub fn until_next_check(now: NaiveDateTime, at: NaiveTime) -> std::time::Duration {
    (next_check(now, at) - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_check_time() {
        assert_eq!(parse_check_time("03:30:00"), NaiveTime::from_hms_opt(3, 30, 0));
        assert_eq!(parse_check_time("23:05"), NaiveTime::from_hms_opt(23, 5, 0));
        assert_eq!(parse_check_time("25:00:00"), None);
    }

    #[test]
    fn test_next_check_later_today() {
        let time = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        assert_eq!(next_check(at(1, 0, 0), time), at(3, 0, 0));
    }

    #[test]
    fn test_next_check_rolls_over_to_tomorrow() {
        let time = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        let next = next_check(at(3, 0, 0), time);
        assert_eq!(next, at(3, 0, 0) + Duration::days(1));
        assert_eq!(until_next_check(at(4, 0, 0), time).as_secs(), 23 * 3600);
    }
}
