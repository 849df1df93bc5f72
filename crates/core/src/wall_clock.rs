// SPDX-License-Identifier: MIT

//! Wall-clock label rendering (SPEC_FULL.md §4.5 "timezone handling").
//!
//! Internally every timestamp is an epoch-millisecond integer; this module
//! is the one place that turns one into the human-readable, timezone-aware
//! label an operator reads in the CLI.

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;

/// Render `epoch_ms` as `YYYY-MM-DD HH:MM:SS TZ` in `timezone`.
///
/// An unrecognized IANA name falls back to UTC rather than failing the
/// caller — a label is diagnostic output, not something worth aborting a
/// command over.
pub fn format_wall_clock(epoch_ms: u64, timezone: &str) -> String {
    let utc = Utc.timestamp_millis_opt(epoch_ms as i64).single().unwrap_or_else(Utc::now);
    match timezone.parse::<Tz>() {
        Ok(tz) => utc.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        Err(_) => utc.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

#[cfg(test)]
#[path = "wall_clock_tests.rs"]
mod tests;
