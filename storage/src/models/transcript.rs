//! Transcript: the formatted result of a range read.
//!
//! Returned by `MessageStore::read_range` and handed verbatim to the summarizer.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Chronological rendering of one partition, oldest message first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// One `[<ISO-8601>] <username>: <text>` line per message, each ending in `\n`.
    pub content: String,
    pub message_count: usize,
    /// Highest sequence covered by this read; pass to `delete_through` to purge
    /// exactly what was read.
    pub watermark: i64,
}

impl Transcript {
    /// Builds a transcript from `(sequence, line)` pairs already in chronological order.
    /// Returns `None` when there are no lines.
    pub(crate) fn from_lines<I>(entries: I) -> Option<Self>
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let mut content = String::new();
        let mut message_count = 0;
        let mut watermark = i64::MIN;

        for (seq, line) in entries {
            content.push_str(&line);
            content.push('\n');
            message_count += 1;
            watermark = watermark.max(seq);
        }

        if message_count == 0 {
            return None;
        }

        Some(Self {
            content,
            message_count,
            watermark,
        })
    }
}

/// Renders epoch seconds as ISO-8601 UTC with millisecond precision,
/// e.g. `2023-11-14T22:13:20.000Z`.
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp.to_string())
}

/// Formats one transcript line (without the trailing newline).
pub fn format_line(timestamp: i64, username: &str, text: &str) -> String {
    format!("[{}] {}: {}", format_timestamp(timestamp), username, text)
}
