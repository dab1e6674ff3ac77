use std::fmt;

use serde::Serialize;

use crate::state::StateStore;
use crate::types::Ticket;

/// Where a local ticket stands relative to the last sync point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketSyncStatus {
    /// Never created remotely
    New,
    /// Has a remote key but no recorded sync point
    Untracked,
    /// Differs from what was last synced
    Modified,
    Clean,
}

impl TicketSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketSyncStatus::New => "new",
            TicketSyncStatus::Untracked => "untracked",
            TicketSyncStatus::Modified => "modified",
            TicketSyncStatus::Clean => "clean",
        }
    }

    /// Whether a push would send this ticket.
    pub fn needs_push(&self) -> bool {
        !matches!(self, TicketSyncStatus::Clean)
    }
}

impl fmt::Display for TicketSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Remote key, or the title for tickets not yet created
    pub label: String,
    pub title: String,
    pub status: TicketSyncStatus,
}

/// Classify one ticket against the state store.
///
/// A ticket whose recorded sync point has differing local and remote hashes
/// (left behind by a strategy resolution) counts as modified until pushed.
pub fn ticket_status(state: &StateStore, ticket: &Ticket) -> TicketSyncStatus {
    if !ticket.is_linked() {
        return TicketSyncStatus::New;
    }
    match state.get_stored_state(&ticket.jira_id) {
        None => TicketSyncStatus::Untracked,
        Some(stored) if stored.local_hash != stored.remote_hash => TicketSyncStatus::Modified,
        Some(_) if state.has_changed(ticket) => TicketSyncStatus::Modified,
        Some(_) => TicketSyncStatus::Clean,
    }
}

/// Report every ticket in file order.
pub fn status(state: &StateStore, tickets: &[Ticket]) -> Vec<StatusEntry> {
    tickets
        .iter()
        .map(|ticket| StatusEntry {
            label: ticket.label().to_string(),
            title: ticket.title.clone(),
            status: ticket_status(state, ticket),
        })
        .collect()
}
