//! Display helpers shared by component replies.

/// Human readable byte count with one decimal, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Compact duration: `45s`, `12m 5s`, `3h 20m`, `2d 4h`.
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Relative time since a unix timestamp, e.g. `5 min ago`.
pub fn time_ago(timestamp: i64, now: i64) -> String {
    let diff = (now - timestamp).max(0);
    if diff < 60 {
        "just now".to_string()
    } else if diff < 3_600 {
        format!("{} min ago", diff / 60)
    } else if diff < 86_400 {
        format!("{} hr ago", diff / 3_600)
    } else {
        format!("{} days ago", diff / 86_400)
    }
}

/// Reply for input that matched no intent: the echoed input followed by
/// example phrasings grouped under headings.
pub fn help_text(input: &str, heading: &str, sections: &[(&str, &[&str])]) -> String {
    let mut out = format!("❓ **I didn't understand:** \"{}\"\n\n{}\n", input.trim(), heading);
    for (title, examples) in sections {
        out.push_str(&format!("\n**{}:**\n", title));
        for example in *examples {
            out.push_str(&format!("• \"{}\"\n", example));
        }
    }
    out.push_str("\n**I understand natural language - speak naturally!** 🤖");
    out
}
