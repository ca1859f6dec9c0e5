use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; RFC 3339 values pass straight through.
pub(crate) fn parse_created_at(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", raw, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::parse_created_at;
    use chrono::{DateTime, Datelike, Timelike, Utc};

    #[test]
    fn parses_sqlite_format() {
        let ts = parse_created_at("2024-03-15 08:30:00");
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.day(), 15);
        assert_eq!(ts.hour(), 8);
        assert_eq!(ts.minute(), 30);
    }

    #[test]
    fn parses_rfc3339() {
        let ts = parse_created_at("2024-03-15T08:30:00Z");
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn corrupt_value_falls_back_to_epoch() {
        assert_eq!(parse_created_at("not a date"), DateTime::<Utc>::default());
    }
}
