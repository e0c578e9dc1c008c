use qaza::models::{DaySummary, PrayerStatus};

/// Create a simple ASCII progress bar
pub fn progress_bar(filled: u64, total: u64, width: usize) -> String {
    if total == 0 {
        return "░".repeat(width);
    }
    let ratio = (filled as f64 / total as f64).min(1.0);
    let filled_count = (ratio * width as f64).round() as usize;
    let empty_count = width.saturating_sub(filled_count);
    format!("{}{}", "█".repeat(filled_count), "░".repeat(empty_count))
}

pub fn status_icon(status: PrayerStatus) -> &'static str {
    match status {
        PrayerStatus::Completed => "✓",
        PrayerStatus::Missed => "✗",
        PrayerStatus::Pending => "○",
    }
}

/// One dot per day: ● all five prayed, ◑ some, ✗ any missed, ○ nothing.
pub fn day_dot(summary: &DaySummary) -> &'static str {
    if summary.missed > 0 {
        "✗"
    } else if summary.completed == 5 {
        "●"
    } else if summary.completed > 0 {
        "◑"
    } else {
        "○"
    }
}

/// Human-readable byte size ("512 B", "3.4 KB", "1.2 MB")
pub fn format_bytes(n: usize) -> String {
    const KB: f64 = 1024.0;
    let f = n as f64;
    if f < KB {
        format!("{} B", n)
    } else if f < KB * KB {
        format!("{:.1} KB", f / KB)
    } else {
        format!("{:.1} MB", f / (KB * KB))
    }
}
