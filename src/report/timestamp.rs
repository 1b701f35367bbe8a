//! Display formatting for PR timestamps, kept apart from the prompt so the
//! rendered prompt never depends on it.

use chrono::{DateTime, Utc};

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub fn format(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(DISPLAY_FORMAT).to_string()
}
