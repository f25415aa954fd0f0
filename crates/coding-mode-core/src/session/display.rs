//! Human-readable remaining time.

/// Countdown style: `"12m 5s"`, `"42s"`, or `"Time is up"`.
pub fn format_countdown(remaining_ms: i64) -> String {
    if remaining_ms <= 0 {
        return "Time is up".to_string();
    }
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1000;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Blocked-page style, rounded up to whole minutes.
pub fn format_minutes_left(remaining_ms: i64) -> String {
    if remaining_ms <= 0 {
        return "less than a minute".to_string();
    }
    let minutes = (remaining_ms + 59_999) / 60_000;
    match minutes {
        1 => "1 minute".to_string(),
        n => format!("{n} minutes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown() {
        assert_eq!(format_countdown(0), "Time is up");
        assert_eq!(format_countdown(42_900), "42s");
        assert_eq!(format_countdown(725_000), "12m 5s");
    }

    #[test]
    fn minutes_left_rounds_up() {
        assert_eq!(format_minutes_left(-1), "less than a minute");
        assert_eq!(format_minutes_left(1), "1 minute");
        assert_eq!(format_minutes_left(60_000), "1 minute");
        assert_eq!(format_minutes_left(60_001), "2 minutes");
    }
}
