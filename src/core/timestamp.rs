// LogCore - core/timestamp.rs
//
// strftime rendering of record timestamps. chrono reports a malformed
// pattern as a formatting error rather than at parse time, so both helpers
// here guard against it instead of letting `to_string()` panic.

use crate::util::constants::DEFAULT_LOG_TIME_FORMAT;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::fmt::Write;

/// `true` if chrono accepts every specifier in `pattern`.
pub fn is_valid_time_format(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Render `time` with `pattern`, falling back to the default pattern when
/// `pattern` is rejected.
pub fn format_timestamp<Tz>(time: &DateTime<Tz>, pattern: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    if write!(out, "{}", time.format(pattern)).is_ok() {
        return out;
    }
    out.clear();
    // The default pattern is known-good; an error here leaves `out` empty.
    let _ = write!(out, "{}", time.format(DEFAULT_LOG_TIME_FORMAT));
    out
}

/// Current local time rendered with `pattern`.
pub fn now(pattern: &str) -> String {
    format_timestamp(&chrono::Local::now(), pattern)
}
