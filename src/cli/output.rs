//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;
use serde_json::Value;

use crate::vault::entry::{CREATED_AT, EXPIRES_AT, SERVICE, UPDATED_AT};
use crate::vault::{Entry, Timestamp};

/// Shown in place of a field value unless `--reveal` is given.
const MASK: &str = "********";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Render a JSON field value for display; strings lose their quotes.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Human-readable expiry column: "never", "expired", or the remaining time.
pub fn expiry_label(entry: &Entry, now: DateTime<Utc>) -> String {
    match entry.expiry() {
        Ok(None) => "never".to_string(),
        Ok(Some(at)) if now >= at => style("expired").red().to_string(),
        Ok(Some(at)) => format!(
            "{} (in {})",
            format_ts(entry.expires_at.as_ref()),
            humanize(at - now)
        ),
        Err(_) => style("malformed").red().to_string(),
    }
}

/// Print one entry as a Field / Value table.
///
/// Caller fields are masked unless `reveal` is set; the service name and
/// timestamps are always shown.
pub fn print_entry(entry: &Entry, reveal: bool, now: DateTime<Utc>) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    table.add_row(vec![SERVICE.to_string(), entry.service.clone()]);
    for (name, value) in &entry.fields {
        let shown = if reveal {
            display_value(value)
        } else {
            MASK.to_string()
        };
        table.add_row(vec![name.clone(), shown]);
    }
    table.add_row(vec![CREATED_AT.to_string(), format_ts(entry.created_at.as_ref())]);
    table.add_row(vec![UPDATED_AT.to_string(), format_ts(entry.updated_at.as_ref())]);
    table.add_row(vec![EXPIRES_AT.to_string(), expiry_label(entry, now)]);

    println!("{table}");
}

/// Print a table of entries (Service, Fields, Updated, Expires).
pub fn print_entries_table(entries: &[Entry], now: DateTime<Utc>) {
    if entries.is_empty() {
        info("No credentials in this vault yet.");
        tip("Run `credvault add <SERVICE> -f key=value` to add your first entry.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Service", "Fields", "Updated", "Expires"]);

    for entry in entries {
        let fields: Vec<&str> = entry.fields.keys().map(String::as_str).collect();
        table.add_row(vec![
            entry.service.clone(),
            fields.join(", "),
            format_ts(entry.updated_at.as_ref()),
            expiry_label(entry, now),
        ]);
    }

    println!("{table}");
}

fn format_ts(ts: Option<&Timestamp>) -> String {
    match ts {
        Some(ts) => match ts.parse() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => ts.as_str().to_string(),
        },
        None => "-".to_string(),
    }
}

fn humanize(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h {}m", s / 3_600, (s % 3_600) / 60),
        s => format!("{}d {}h", s / 86_400, (s % 86_400) / 3_600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_value_strips_string_quotes() {
        assert_eq!(display_value(&Value::from("octo")), "octo");
        assert_eq!(display_value(&Value::from(42)), "42");
        assert_eq!(display_value(&Value::Bool(true)), "true");
    }

    #[test]
    fn humanize_picks_a_unit() {
        assert_eq!(humanize(chrono::Duration::seconds(5)), "5s");
        assert_eq!(humanize(chrono::Duration::seconds(125)), "2m");
        assert_eq!(humanize(chrono::Duration::seconds(3_660)), "1h 1m");
        assert_eq!(humanize(chrono::Duration::seconds(90_000)), "1d 1h");
        assert_eq!(humanize(chrono::Duration::seconds(-3)), "0s");
    }

    #[test]
    fn expiry_label_for_entry_without_expiry() {
        let entry: Entry = serde_json::from_value(serde_json::json!({
            "id": 1,
            "service": "GitHub",
        }))
        .unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expiry_label(&entry, now), "never");
    }
}
