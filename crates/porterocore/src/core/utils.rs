//! Shared time and formatting helpers.
//!
//! Timestamps are stored as UTC `"%Y-%m-%d %H:%M:%S"` strings. The format
//! sorts lexically, so expiry comparisons in SQL stay plain string
//! comparisons.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Storage format for all timestamps
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time in storage format
pub fn now_string() -> String {
    format_ts(Utc::now())
}

/// Format a timestamp in storage format
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(DATETIME_FMT).to_string()
}

/// Parse a storage-format timestamp back into a `DateTime<Utc>`
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Expiry timestamp for a grant: join date plus whole days.
pub fn expiry_after(joined: DateTime<Utc>, duration_days: i64) -> DateTime<Utc> {
    joined + Duration::days(duration_days)
}

/// Human readable file size ("1.40 GB", "476.84 MB", "512 B")
pub fn format_file_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes.max(0) as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{} B", bytes.max(0))
    }
}

/// Fallback display name for media that arrived without a filename.
/// Mirrors the indexer's smart name detection.
pub fn generated_file_name(file_size: i64) -> String {
    format!("Video_{}.mp4", file_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn expiry_is_exactly_days_after_join() {
        let joined = parse_ts("2026-01-15 10:30:00").unwrap();
        let expiry = expiry_after(joined, 30);
        assert_eq!(format_ts(expiry), "2026-02-14 10:30:00");
    }

    #[test]
    fn timestamps_round_trip() {
        let now = now_string();
        let parsed = parse_ts(&now).unwrap();
        assert_eq!(format_ts(parsed), now);
    }

    #[test]
    fn storage_format_sorts_lexically() {
        let earlier = format_ts(parse_ts("2026-01-15 10:30:00").unwrap());
        let later = format_ts(parse_ts("2026-02-14 09:00:00").unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn file_sizes_format_by_magnitude() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.00 KB");
        assert_eq!(format_file_size(500_000_000), "476.84 MB");
        assert_eq!(format_file_size(1_500_000_000), "1.40 GB");
    }

    #[test]
    fn generated_name_embeds_size() {
        assert_eq!(generated_file_name(500_000_000), "Video_500000000.mp4");
    }
}
