//! Check, adjustment and status output.

use super::to_json;
use crate::error::ApiError;
use crate::instance::{InstanceState, PassOutcome, PassSummary};
use crate::reconcile::{AggregateState, FlagCounts};
use chrono::{TimeZone, Utc};
use owo_colors::OwoColorize;
use serde_json::json;

/// Colored state label for terminal output.
pub fn state_label(state: AggregateState) -> String {
    let label = state.label();
    match state {
        AggregateState::Synced => label.green().to_string(),
        AggregateState::Updateable => label.yellow().to_string(),
        AggregateState::Modified | AggregateState::Unclear => label.magenta().to_string(),
        AggregateState::Faulty => label.red().bold().to_string(),
        AggregateState::Unknown => label.dimmed().to_string(),
    }
}

fn counts_json(counts: &FlagCounts) -> serde_json::Value {
    json!(counts)
}

fn counts_text(counts: &FlagCounts) -> String {
    let pairs = [
        ("added", counts.added),
        ("removed", counts.removed),
        ("lost", counts.lost),
        ("moved", counts.moved),
        ("orphan", counts.orphan),
        ("missing", counts.missing),
        ("modified", counts.modified),
        ("renamed", counts.renamed),
        ("outdated", counts.outdated),
        ("unknown", counts.unknown),
    ];
    let set: Vec<String> = pairs
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(name, n)| format!("{} {}", n, name))
        .collect();
    if set.is_empty() {
        "no drift".to_string()
    } else {
        set.join(", ")
    }
}

fn timestamp_text(ts: Option<i64>) -> String {
    ts.and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

fn summary_json(summary: &PassSummary) -> serde_json::Value {
    let mut value = json!({
        "status": "completed",
        "state": summary.state,
        "state_code": summary.state.code(),
        "revision": summary.revision,
        "files": summary.files,
        "counts": counts_json(&summary.counts),
        "messages": summary.messages,
    });
    if let Some(report) = &summary.adjustment {
        value["adjustment"] = json!({
            "created": report.created,
            "updated": report.updated,
            "relocated": report.relocated,
            "failed": report.failed,
        });
    }
    value
}

pub fn format_pass_outcome(outcome: &PassOutcome, format: &str) -> Result<String, ApiError> {
    match (outcome, format) {
        (PassOutcome::Skipped { reason }, "json") => {
            to_json(&json!({"status": "skipped", "reason": reason}))
        }
        (PassOutcome::Skipped { reason }, _) => Ok(format!("Skipped: {}", reason)),
        (PassOutcome::Completed(summary), "json") => to_json(&summary_json(summary)),
        (PassOutcome::Completed(summary), _) => {
            let mut out = format!(
                "State: {} ({})\nRevision: {}\nFiles: {} ({})",
                state_label(summary.state),
                summary.state.code(),
                summary.revision,
                summary.files,
                counts_text(&summary.counts)
            );
            if let Some(report) = &summary.adjustment {
                out.push_str(&format!(
                    "\nAdjusted: {} created, {} updated, {} relocated, {} failed",
                    report.created, report.updated, report.relocated, report.failed
                ));
                for (filename, lines) in &report.messages {
                    for line in lines.iter().filter(|l| l.contains("failed")) {
                        out.push_str(&format!("\n  {}: {}", filename, line));
                    }
                }
            }
            Ok(out)
        }
    }
}

pub fn format_status(
    instance: &str,
    state: &InstanceState,
    counts: &FlagCounts,
    files: usize,
    format: &str,
) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&json!({
            "instance": instance,
            "state": state.state,
            "state_code": state.state.code(),
            "commit": state.commit,
            "top_version": state.top_version,
            "current_version": state.current_version,
            "last_check": state.last_check,
            "last_adjustment": state.last_adjustment,
            "fault": state.fault,
            "files": files,
            "counts": counts_json(counts),
        }));
    }

    let mut out = format!(
        "Instance: {}\nState: {} ({})\nAdopted revision: {}\nVersions: current {} / top {}\nLast check: {}\nLast adjustment: {}\nFiles: {} ({})",
        instance,
        state_label(state.state),
        state.state.code(),
        state.commit.as_deref().unwrap_or("none"),
        state.current_version.as_deref().unwrap_or("-"),
        state.top_version.as_deref().unwrap_or("-"),
        timestamp_text(state.last_check),
        timestamp_text(state.last_adjustment),
        files,
        counts_text(counts)
    );
    if let Some(fault) = &state.fault {
        out.push_str(&format!("\nFault: {}", fault.red()));
    }
    Ok(out)
}
