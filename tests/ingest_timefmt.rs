// tests/ingest_timefmt.rs
use chrono::{Duration, SecondsFormat, TimeZone, Utc};
use feed_river::ingest::timefmt::{format_time_ago, format_time_ago_at};

fn ago(secs: i64) -> String {
    let now = Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap();
    let then = (now - Duration::seconds(secs)).to_rfc3339_opts(SecondsFormat::Secs, true);
    format_time_ago_at(Some(&then), now)
}

#[test]
fn coarse_labels() {
    assert_eq!(ago(45), "just now");
    assert_eq!(ago(5 * 60), "5m ago");
    assert_eq!(ago(3 * 3_600), "3h ago");
    assert_eq!(ago(2 * 86_400), "2d ago");
}

#[test]
fn tier_boundaries() {
    assert_eq!(ago(59), "just now");
    assert_eq!(ago(60), "1m ago");
    assert_eq!(ago(3_599), "59m ago");
    assert_eq!(ago(3_600), "1h ago");
    assert_eq!(ago(86_399), "23h ago");
    assert_eq!(ago(86_400), "1d ago");
    assert_eq!(ago(45 * 86_400), "45d ago");
}

#[test]
fn future_dated_entries_read_just_now() {
    assert_eq!(ago(-600), "just now");
}

#[test]
fn wall_clock_variant_handles_rss_dates() {
    let recent = (Utc::now() - Duration::minutes(10)).to_rfc2822();
    let label = format_time_ago(Some(&recent));
    assert!(label == "10m ago" || label == "9m ago" || label == "11m ago", "{label}");
    assert_eq!(format_time_ago(None), "");
    assert_eq!(format_time_ago(Some("")), "");
}
