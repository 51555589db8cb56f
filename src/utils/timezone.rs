use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Current time in the given display timezone
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Date and time as shown in reports, e.g. `2024-01-22 16:45 UTC`
pub fn format_timestamp(at: &DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}

/// Calendar date in the display timezone
pub fn format_date(at: &DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d").to_string()
}
