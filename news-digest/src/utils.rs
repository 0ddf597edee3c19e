/// Title handling shared by the pipeline and the digest writer
pub mod text {
    /// Key used for title de-duplication
    pub fn normalize_title(title: &str) -> String {
        title.trim().to_string()
    }
}

/// Publish date utilities
pub mod time {
    use chrono::{DateTime, Datelike, NaiveDateTime, Utc};

    pub const INVALID_DATE: &str = "Invalid Date";

    /// Parse a feed `pubDate`. The conversion service emits
    /// `YYYY-MM-DD HH:MM:SS` in UTC; RFC 3339 and RFC 2822 are accepted too.
    pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc2822(raw))
            .map(|d| d.with_timezone(&Utc))
            .ok()
    }

    /// US short date (`5/1/2024`), or "Invalid Date"
    pub fn format_short_date(date: Option<DateTime<Utc>>) -> String {
        match date {
            Some(d) => format!("{}/{}/{}", d.month(), d.day(), d.year()),
            None => INVALID_DATE.to_string(),
        }
    }
}
