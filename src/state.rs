//! Persistent record of the last conflict-free sync point per ticket.
//!
//! Each remote ticket key maps to the pair of content hashes seen on either
//! side when the ticket was last reconciled. Comparing the current hashes
//! against that pair tells the reconciler which side moved.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Task, Ticket};
use crate::utils::write_atomic;

/// Hashes recorded for one ticket at its last sync point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketState {
    pub local_hash: String,
    pub remote_hash: String,
}

impl TicketState {
    pub fn new(local_hash: impl Into<String>, remote_hash: impl Into<String>) -> Self {
        Self {
            local_hash: local_hash.into(),
            remote_hash: remote_hash.into(),
        }
    }
}

/// Compute the content digest of a ticket.
///
/// Covers title, description, acceptance criteria, custom fields and tasks.
/// Custom fields are fed in key order so map iteration order never leaks
/// into the digest. Every string is length-prefixed, keeping adjacent fields
/// from running together.
pub fn calculate_hash(ticket: &Ticket) -> String {
    let mut hasher = blake3::Hasher::new();
    feed_str(&mut hasher, &ticket.title);
    feed_str(&mut hasher, &ticket.description);
    feed_list(&mut hasher, &ticket.acceptance_criteria);
    feed_fields(&mut hasher, &ticket.custom_fields);
    feed_len(&mut hasher, ticket.tasks.len());
    for task in &ticket.tasks {
        feed_task(&mut hasher, task);
    }
    hasher.finalize().to_hex().to_string()
}

fn feed_task(hasher: &mut blake3::Hasher, task: &Task) {
    feed_str(hasher, &task.jira_id);
    feed_str(hasher, &task.title);
    feed_str(hasher, &task.description);
    feed_list(hasher, &task.acceptance_criteria);
    feed_fields(hasher, &task.custom_fields);
}

fn feed_len(hasher: &mut blake3::Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn feed_str(hasher: &mut blake3::Hasher, value: &str) {
    feed_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn feed_list(hasher: &mut blake3::Hasher, values: &[String]) {
    feed_len(hasher, values.len());
    for value in values {
        feed_str(hasher, value);
    }
}

fn feed_fields(hasher: &mut blake3::Hasher, fields: &HashMap<String, String>) {
    let sorted: BTreeMap<&str, &str> = fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    feed_len(hasher, sorted.len());
    for (key, value) in sorted {
        feed_str(hasher, key);
        feed_str(hasher, value);
    }
}

/// Table of sync states keyed by remote ticket key, backed by a JSON file.
///
/// The store is constructed per workspace and handed to whatever needs it.
/// A run loads it once, mutates it, and saves it once; concurrent runs
/// against the same file must be serialized by the caller.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    states: HashMap<String, TicketState>,
}

impl StateStore {
    /// Create an empty store backed by `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            states: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory table with the contents of the backing file.
    ///
    /// A missing file leaves the table empty.
    pub fn load(&mut self) -> Result<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("no sync state at {}, starting fresh", self.path.display());
                self.states.clear();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.states = if content.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&content).inspect_err(|e| {
                tracing::warn!("sync state at {} is corrupt: {e}", self.path.display());
            })?
        };
        tracing::debug!(
            "loaded {} sync state entries from {}",
            self.states.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Overwrite the backing file with the full table.
    pub fn save(&self) -> Result<()> {
        let sorted: BTreeMap<&String, &TicketState> = self.states.iter().collect();
        let content = serde_json::to_string_pretty(&sorted)?;
        write_atomic(&self.path, content.as_bytes())?;
        tracing::debug!(
            "saved {} sync state entries to {}",
            self.states.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn get_stored_state(&self, id: &str) -> Option<&TicketState> {
        self.states.get(id)
    }

    pub fn set_stored_state(&mut self, id: impl Into<String>, state: TicketState) {
        self.states.insert(id.into(), state);
    }

    /// Record the ticket's current content as the agreed state on both sides.
    pub fn update_hash(&mut self, ticket: &Ticket) {
        if !ticket.is_linked() {
            return;
        }
        let hash = calculate_hash(ticket);
        self.states
            .insert(ticket.jira_id.clone(), TicketState::new(hash.clone(), hash));
    }

    /// Record the ticket's current content as the local side only.
    pub fn update_local_hash(&mut self, ticket: &Ticket) {
        if !ticket.is_linked() {
            return;
        }
        let hash = calculate_hash(ticket);
        self.states
            .entry(ticket.jira_id.clone())
            .or_default()
            .local_hash = hash;
    }

    /// Whether the ticket differs from its last recorded local content.
    ///
    /// Tickets with no recorded state count as changed.
    pub fn has_changed(&self, ticket: &Ticket) -> bool {
        match self.states.get(&ticket.jira_id) {
            Some(state) => state.local_hash != calculate_hash(ticket),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
