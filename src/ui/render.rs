//! Plain-text rendering of the console's views.

use crate::models::{ConsoleState, SelectionKind, SelectionSummary};
use crate::presenter::{
    DashboardView, HistoryRow, HistoryView, NO_DETECTED_ITEMS, NO_MISSING_ITEMS, ResultView, Tone,
};
use crate::state::StateChange;
use std::fmt::Write;

fn tone_marker(tone: Tone) -> &'static str {
    match tone {
        Tone::Positive => "[OK]",
        Tone::Warning => "[!!]",
    }
}

fn item_line(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

fn none_if_empty(items: &[String]) -> String {
    item_line(items, "None")
}

pub fn render_result(view: &ResultView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", tone_marker(view.verdict.tone), view.verdict.label);
    let _ = writeln!(out, "  Confidence score: {}", view.confidence);
    if !view.reason.is_empty() {
        let _ = writeln!(out, "  Reason: {}", view.reason);
    }
    let _ = writeln!(out, "  Detected: {}", item_line(&view.detected, NO_DETECTED_ITEMS));
    let _ = write!(out, "  Missing:  {}", item_line(&view.missing, NO_MISSING_ITEMS));
    out
}

pub fn render_selection(selection: &SelectionSummary) -> String {
    match selection.kind {
        SelectionKind::None => "No media selected yet.".to_string(),
        SelectionKind::CameraLive => "Camera is live; use `capture` to take a photo.".to_string(),
        SelectionKind::CapturedOrUploaded => {
            let kind = if selection.is_video() { "video" } else { "image" };
            let mut line = format!(
                "{} ({}, {} bytes)",
                selection.file_name.as_deref().unwrap_or("unnamed"),
                kind,
                selection.size_bytes
            );
            if let Some(path) = &selection.preview_path {
                let _ = write!(line, "\n  Preview: {}", path);
            }
            line
        }
    }
}

pub fn render_status(state: &ConsoleState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Selection: {}", render_selection(&state.selection));
    let _ = write!(out, "Status: {}", state.submission.label());
    if state.can_submit() {
        out.push_str(" (ready to analyze)");
    }
    if let Some(message) = state.submission.error_message() {
        let _ = write!(out, "\nLast error: {}", message);
    }
    if let Some(result) = state.submission.result() {
        let _ = write!(out, "\n{}", render_result(&ResultView::from_result(result)));
    }
    out
}

fn render_row(row: &HistoryRow) -> String {
    let mut line = format!(
        "#{:<5} {}  {:<6} {:<8} {:>6}  detected: {}  missing: {}",
        row.id,
        row.timestamp,
        row.file_type,
        row.status,
        row.confidence,
        none_if_empty(&row.detected),
        none_if_empty(&row.missing)
    );
    if !row.reason.is_empty() {
        let _ = write!(line, "\n        {}", row.reason);
    }
    line
}

pub fn render_history(view: &HistoryView, page: u32) -> String {
    let mut out = format!(
        "Detection History (page {}): {} records, {} accepted, {} denied",
        page + 1,
        view.total,
        view.accepted,
        view.denied
    );
    if view.rows.is_empty() {
        out.push_str("\nNo detections yet. Run your first safety scan with `upload` or `camera start`.");
    }
    for row in &view.rows {
        out.push('\n');
        out.push_str(&render_row(row));
    }
    out
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total detections: {}", view.total);
    let _ = writeln!(out, "Accepted:         {}", view.accepted);
    let _ = writeln!(out, "Denied:           {}", view.denied);
    let _ = write!(out, "Approval rate:    {}%", view.acceptance_rate);
    if !view.recent.is_empty() {
        out.push_str("\nRecent detections:");
        for row in &view.recent {
            out.push('\n');
            out.push_str(&render_row(row));
        }
    }
    out
}

/// Line to print for a state change, if any
pub fn render_event(change: &StateChange, state: &ConsoleState) -> Option<String> {
    match change {
        StateChange::SelectionChanged {
            kind: SelectionKind::CapturedOrUploaded,
        } => Some(format!("Selected {}", render_selection(&state.selection))),
        StateChange::CameraStateChanged { live: true } => Some("Camera started.".to_string()),
        StateChange::CameraStateChanged { live: false } => Some("Camera stopped.".to_string()),
        StateChange::SubmissionStarted { .. } => Some("Analyzing...".to_string()),
        StateChange::SubmissionCompleted { .. } => state
            .submission
            .result()
            .map(|result| render_result(&ResultView::from_result(result))),
        StateChange::SubmissionFailed { message } => Some(format!("Detection failed: {}", message)),
        StateChange::UserNotice { message } => Some(format!("! {}", message)),
        StateChange::StaleResponseDiscarded { .. } => {
            Some("(ignored a late response for a previous selection)".to_string())
        }
        StateChange::StateReset => Some("Reset. No media selected.".to_string()),
        StateChange::SelectionChanged { .. } | StateChange::ReadinessChanged { .. } => None,
    }
}
