use chrono::{DateTime, Utc};

pub fn human_bytes(b: u64) -> String {
    const UNIT: u64 = 1024;
    if b < UNIT {
        return format!("{} B", b);
    }
    let suffixes = ["KB", "MB", "GB", "TB"];
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = b / UNIT;
    while n >= UNIT && exp < suffixes.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}", b as f64 / div as f64, suffixes[exp])
}

pub fn human_duration_secs(total_secs: i64) -> String {
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        format!("{}m{}s", total_secs / 60, total_secs % 60)
    } else if total_secs < 86400 {
        format!("{}h{}m", total_secs / 3600, (total_secs % 3600) / 60)
    } else {
        let days = total_secs / 86400;
        let hours = (total_secs % 86400) / 3600;
        format!("{}d{}h", days, hours)
    }
}

/// Age of an RFC 3339 timestamp, or an empty string when absent or invalid.
pub fn parse_age(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let ts = match timestamp {
        Some(s) if !s.is_empty() => s,
        _ => return String::new(),
    };

    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => human_duration_secs((now - dt.to_utc()).num_seconds().max(0)),
        Err(_) => String::new(),
    }
}

/// Parse a percentage string such as `"91.9%"`. Malformed input yields 0.
pub fn parse_percent(s: &str) -> f64 {
    s.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
