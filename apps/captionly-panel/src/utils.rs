use captionly_shared::api::OptionEntry;
use chrono::{DateTime, Utc};

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

pub fn format_optional_date(dt: Option<&DateTime<Utc>>) -> String {
    dt.map(format_date).unwrap_or_else(|| "-".to_string())
}

/// `(wire name, label)` pairs for a closed option set.
pub fn option_entries<T: Copy>(
    all: &[T],
    value: impl Fn(&T) -> &'static str,
    label: impl Fn(&T) -> &'static str,
) -> Vec<OptionEntry> {
    all.iter()
        .map(|item| OptionEntry {
            value: value(item).to_string(),
            label: label(item).to_string(),
        })
        .collect()
}

pub fn panel_version() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}
