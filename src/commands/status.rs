use std::path::Path;

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::error::Result;
use crate::paths;
use crate::state::StateStore;
use crate::store::{TicketStore, YamlTicketFile};
use crate::sync::{StatusEntry, TicketSyncStatus, status};

/// Show how each local ticket compares to the last sync
pub fn cmd_status(file: &Path, output_json: bool) -> Result<()> {
    let tickets = YamlTicketFile.get_tickets(file)?;
    let mut state = StateStore::new(paths::state_path());
    state.load()?;

    let entries = status(&state, &tickets);

    CommandOutput::new(json!({
        "file": file.display().to_string(),
        "tickets": entries,
    }))
    .with_text(format_status(&entries))
    .print(output_json)
}

fn format_status(entries: &[StatusEntry]) -> String {
    if entries.is_empty() {
        return "No tickets".to_string();
    }

    let width = entries.iter().map(|e| e.label.len()).max().unwrap_or(0).min(24);
    entries
        .iter()
        .map(|entry| {
            let tag = format!("{:10}", entry.status.as_str());
            let tag = match entry.status {
                TicketSyncStatus::New => tag.green().to_string(),
                TicketSyncStatus::Untracked => tag.yellow().to_string(),
                TicketSyncStatus::Modified => tag.cyan().to_string(),
                TicketSyncStatus::Clean => tag.dimmed().to_string(),
            };
            if entry.label == entry.title {
                format!("{tag} {}", entry.title)
            } else {
                format!("{tag} {:width$} {}", entry.label, entry.title)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
