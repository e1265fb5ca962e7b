//! Text and JSON rendering of [`PresentationState`].

use std::fmt::Write;

use anyhow::Result;
use folio_core::models::ResourceValue;
use folio_core::{PresentationState, ResourceState};

pub fn state_json(state: &PresentationState) -> Result<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Single-line JSON, one document per update.
pub fn state_json_line(state: &PresentationState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

pub fn state_table(state: &PresentationState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:<9} {}", "RESOURCE", "STATUS", "DETAIL");
    for (id, entry) in &state.resources {
        let _ = writeln!(
            out,
            "{:<10} {:<9} {}",
            id.as_str(),
            status(entry),
            detail(entry)
        );
    }
    if state.session_expired {
        let _ = writeln!(out, "session expired: sign in again and reload");
    }
    if let Some(err) = &state.last_error {
        let _ = writeln!(out, "error: {}", err);
    }
    out
}

fn status(entry: &ResourceState) -> &'static str {
    if entry.loading {
        "loading"
    } else if entry.error.is_some() {
        "failed"
    } else if entry.fallback.is_some() {
        "fallback"
    } else if entry.value.is_some() {
        "ok"
    } else {
        "-"
    }
}

fn detail(entry: &ResourceState) -> String {
    if let Some(err) = &entry.error {
        return err.clone();
    }
    match &entry.value {
        Some(ResourceValue::Portfolio(p)) => format!(
            "value {:.2}  day {:+.2} ({:+.2}%)  {} holding(s)",
            p.total_value,
            p.day_change,
            p.day_change_percent,
            p.holdings.len()
        ),
        Some(ResourceValue::Trending(list)) => list
            .iter()
            .map(|s| format!("{} {:+.1}%", s.symbol, s.change_percent))
            .collect::<Vec<_>>()
            .join(", "),
        None => String::new(),
    }
}
