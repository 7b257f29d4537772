use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem};

use crate::todo::format_iso_date;

/// Metadata keys whose values are dates.
pub const DATE_KEYS: [&str; 5] = ["due", "t", "threshold", "start", "scheduled"];

const DATE_LAYOUTS: [&[BorrowedFormatItem<'static>]; 5] = [
    format_description!("[year]-[month]-[day]"),
    format_description!("[year]/[month]/[day]"),
    format_description!("[year].[month].[day]"),
    format_description!("[month]/[day]/[year]"),
    format_description!("[day]-[month]-[year]"),
];

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_date_key(key: &str) -> bool {
    DATE_KEYS.contains(&key)
}

/// Rewrites a date value to `YYYY-MM-DD` using the first layout that parses.
/// Returns `None` when nothing matches; the caller keeps the original value.
pub fn normalize_date_value(value: &str) -> Option<String> {
    for layout in DATE_LAYOUTS {
        if let Ok(date) = Date::parse(value, layout) {
            return Some(format_iso_date(date));
        }
    }

    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(|stamp| format_iso_date(stamp.date()))
}
