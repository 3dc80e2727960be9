// src/ingest/timefmt.rs
//! Feed date parsing and coarse "time ago" labels.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime,
};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

fn offset_to_ms(dt: OffsetDateTime) -> i64 {
    (dt.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Parse an RSS (RFC 2822) or Atom (RFC 3339) date into epoch millis.
///
/// Falls back to chrono's lenient RFC 2822 reader (obsolete zone names) and to
/// zone-less forms, read as UTC. Pre-epoch dates count as unknown.
pub fn parse_timestamp_ms(date_text: &str) -> Option<i64> {
    let s = date_text.trim();
    if s.is_empty() {
        return None;
    }

    let ms = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .map(offset_to_ms)
        .ok()
        .or_else(|| DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.timestamp_millis()))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|naive| naive.and_utc().timestamp_millis())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().timestamp_millis())
        })?;

    (ms > 0).then_some(ms)
}

/// Label for an absolute timestamp relative to `now`; empty when unknown (0).
pub fn relative_label(timestamp_ms: i64, now: DateTime<Utc>) -> String {
    if timestamp_ms <= 0 {
        return String::new();
    }
    let elapsed_ms = now.timestamp_millis() - timestamp_ms;
    // Future-dated entries (clock skew) read as fresh instead of "-3m ago".
    if elapsed_ms < 0 {
        return "just now".to_string();
    }

    let seconds = elapsed_ms / 1_000;
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

pub fn format_time_ago_at(date_text: Option<&str>, now: DateTime<Utc>) -> String {
    date_text
        .and_then(parse_timestamp_ms)
        .map(|ts| relative_label(ts, now))
        .unwrap_or_default()
}

/// [`format_time_ago_at`] against the wall clock.
pub fn format_time_ago(date_text: Option<&str>) -> String {
    format_time_ago_at(date_text, Utc::now())
}
