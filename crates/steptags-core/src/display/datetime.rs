//! DateTime display utilities.

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

/// A `Timestamp` shown in the system timezone as `YYYY-MM-DD HH:MM:SS TZ`.
pub struct LocalDateTime<'a>(pub &'a Timestamp);

impl fmt::Display for LocalDateTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .to_zoned(TimeZone::system())
                .strftime("%Y-%m-%d %H:%M:%S %Z")
        )
    }
}

/// Coarse age of a timestamp relative to `now`, as used in activity feeds:
/// `just now`, `5m ago`, `3h ago`, `2d ago`. Anything older than a month
/// falls back to the date.
pub struct RelativeTime {
    pub at: Timestamp,
    pub now: Timestamp,
}

impl RelativeTime {
    pub fn since_now(at: Timestamp) -> Self {
        Self {
            at,
            now: Timestamp::now(),
        }
    }
}

impl fmt::Display for RelativeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.now.as_second() - self.at.as_second();
        match seconds {
            s if s < 60 => write!(f, "just now"),
            s if s < 3_600 => write!(f, "{}m ago", s / 60),
            s if s < 86_400 => write!(f, "{}h ago", s / 3_600),
            s if s < 30 * 86_400 => write!(f, "{}d ago", s / 86_400),
            _ => write!(
                f,
                "{}",
                self.at.to_zoned(TimeZone::system()).strftime("%Y-%m-%d")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ago(seconds: i64) -> String {
        let now: Timestamp = "2026-05-01T12:00:00Z".parse().unwrap();
        let at = Timestamp::from_second(now.as_second() - seconds).unwrap();
        RelativeTime { at, now }.to_string()
    }

    #[test]
    fn test_relative_time_buckets() {
        assert_eq!(ago(-30), "just now");
        assert_eq!(ago(59), "just now");
        assert_eq!(ago(5 * 60), "5m ago");
        assert_eq!(ago(3 * 3_600 + 10), "3h ago");
        assert_eq!(ago(2 * 86_400), "2d ago");
        assert!(ago(60 * 86_400).starts_with("2026-03-0"));
    }
}
