use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Monday and Sunday of the ISO week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its UTC date is used).
pub fn parse_week_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| format!("Invalid weekDate '{}'; expected YYYY-MM-DD", raw))
}

/// "Oct 19, 2026 - Oct 25, 2026"
pub fn format_week_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", start.format("%b %-d, %Y"), end.format("%b %-d, %Y"))
}
