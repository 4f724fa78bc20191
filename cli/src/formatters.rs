//! Output formatting utilities

use chrono::{Local, TimeZone};
use colored::*;

/// Format a Unix timestamp to human-readable date/time
pub fn format_timestamp(ts: u64) -> String {
    if ts == 0 {
        return "-".to_string();
    }
    match Local.timestamp_opt(ts as i64, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => "invalid".to_string(),
    }
}

/// Format a service state with appropriate color
pub fn format_state(state: &str) -> ColoredString {
    match state {
        "running" => state.green(),
        "failed" | "error" => state.red(),
        "starting" | "stopping" => state.yellow(),
        "discovered" => state.cyan(),
        _ => state.normal(),
    }
}

/// Format a health status with appropriate color
pub fn format_health(status: &str) -> ColoredString {
    match status {
        "healthy" => status.green(),
        "unhealthy" => status.red(),
        _ => status.normal(),
    }
}

/// Format seconds of uptime as a compact duration
pub fn format_uptime(secs: u64) -> String {
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
