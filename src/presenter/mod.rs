//! Display models derived from backend payloads.
//!
//! Everything here is pure: no I/O, no state, no errors. Rendering to text
//! happens in [`crate::ui::render`].

use crate::models::{DashboardStats, DetectionRecord, DetectionResult};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde_json::Value;

pub const NO_DETECTED_ITEMS: &str = "No detected equipment listed.";
pub const NO_MISSING_ITEMS: &str = "No missing equipment detected.";

/// How an item list arrived from the backend
#[derive(Debug, Clone, PartialEq)]
pub enum ItemList {
    Items(Vec<String>),
    Absent,
    Malformed,
}

impl ItemList {
    /// Collapse to a display list; absent and malformed both become empty
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ItemList::Items(items) => items,
            ItemList::Absent | ItemList::Malformed => Vec::new(),
        }
    }
}

/// Classify a raw `detected_items` / `missing_items` value.
///
/// Accepts a JSON array, a string holding a JSON array, or nothing.
/// Non-string array elements are dropped.
pub fn parse_item_list(value: &Value) -> ItemList {
    match value {
        Value::Null => ItemList::Absent,
        Value::Array(entries) => ItemList::Items(strings_only(entries)),
        Value::String(encoded) if encoded.trim().is_empty() => ItemList::Absent,
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Array(entries)) => ItemList::Items(strings_only(&entries)),
            _ => ItemList::Malformed,
        },
        _ => ItemList::Malformed,
    }
}

fn strings_only(entries: &[Value]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| entry.as_str().map(str::to_string))
        .collect()
}

/// Total, idempotent normaliser for item lists. Never fails; malformed input
/// is logged at debug level and shown as an empty list.
pub fn normalize_item_list(value: &Value) -> Vec<String> {
    let parsed = parse_item_list(value);
    if parsed == ItemList::Malformed {
        tracing::debug!("Ignoring malformed item list: {}", value);
    }
    parsed.into_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub label: &'static str,
    pub tone: Tone,
}

pub fn classify(result: &DetectionResult) -> Verdict {
    if result.is_safe {
        Verdict {
            label: "Entry Approved",
            tone: Tone::Positive,
        }
    } else {
        Verdict {
            label: "Entry Denied",
            tone: Tone::Warning,
        }
    }
}

/// Confidence as the backend sent it, with a percent sign (`97` -> `"97%"`)
pub fn format_confidence(confidence: f64) -> String {
    format!("{}%", confidence)
}

/// Everything the result panel shows
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub verdict: Verdict,
    pub confidence: String,
    pub reason: String,
    pub detected: Vec<String>,
    pub missing: Vec<String>,
}

impl ResultView {
    pub fn from_result(result: &DetectionResult) -> Self {
        Self {
            verdict: classify(result),
            confidence: format_confidence(result.confidence),
            reason: result.reason.clone(),
            detected: normalize_item_list(&result.detected_items),
            missing: normalize_item_list(&result.missing_items),
        }
    }
}

/// Parse a backend timestamp. Values without an offset are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Local date and time for display; unparseable values are shown verbatim
pub fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => raw.to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub id: i64,
    pub timestamp: String,
    pub file_type: String,
    pub status: &'static str,
    pub is_safe: bool,
    pub confidence: String,
    pub detected: Vec<String>,
    pub missing: Vec<String>,
    pub reason: String,
}

impl HistoryRow {
    pub fn from_record(record: &DetectionRecord) -> Self {
        Self {
            id: record.id,
            timestamp: format_timestamp(&record.created_at),
            file_type: capitalize(&record.file_type),
            status: if record.is_safe { "Accepted" } else { "Denied" },
            is_safe: record.is_safe,
            confidence: format_confidence(record.confidence),
            detected: normalize_item_list(&record.detected_items),
            missing: normalize_item_list(&record.missing_items),
            reason: record.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryView {
    pub rows: Vec<HistoryRow>,
    pub total: usize,
    pub accepted: usize,
    pub denied: usize,
}

impl HistoryView {
    pub fn from_records(records: &[DetectionRecord]) -> Self {
        let rows: Vec<HistoryRow> = records.iter().map(HistoryRow::from_record).collect();
        let accepted = rows.iter().filter(|row| row.is_safe).count();

        Self {
            total: rows.len(),
            accepted,
            denied: rows.len() - accepted,
            rows,
        }
    }
}

/// Share of accepted detections, rounded to the nearest whole percent
pub fn acceptance_rate(accepted: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (accepted as f64 / total as f64 * 100.0).round() as u64
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub total: u64,
    pub accepted: u64,
    pub denied: u64,
    pub acceptance_rate: u64,
    pub recent: Vec<HistoryRow>,
}

impl DashboardView {
    pub fn from_stats(stats: &DashboardStats) -> Self {
        Self {
            total: stats.total_detections,
            accepted: stats.total_accepted,
            denied: stats.total_denied,
            acceptance_rate: acceptance_rate(stats.total_accepted, stats.total_detections),
            recent: stats
                .recent_detections
                .iter()
                .map(HistoryRow::from_record)
                .collect(),
        }
    }
}
