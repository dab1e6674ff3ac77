use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

pub const SYNC_DIR: &str = ".ticketsync";

/// Custom field that carries a ticket's parent (epic or story) key.
pub const PARENT_FIELD: &str = "Parent";

/// Maximum number of tickets a single bulk operation may touch.
pub const MAX_BULK_TICKETS: usize = 100;

static TICKET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+-[0-9]+$").expect("ticket id pattern is valid"));

/// A work item as edited locally and mirrored remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_fields: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,

    /// Remote key. Empty until the ticket has been created remotely.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jira_id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,

    /// Position in the source file, for diagnostics only.
    #[serde(skip)]
    pub source_line: usize,
}

/// A sub-item owned by exactly one [`Ticket`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_fields: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jira_id: String,

    #[serde(skip)]
    pub source_line: usize,
}

impl Ticket {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Whether the ticket already exists remotely.
    pub fn is_linked(&self) -> bool {
        !self.jira_id.is_empty()
    }

    /// Display label used in logs and progress messages.
    pub fn label(&self) -> &str {
        if self.jira_id.is_empty() {
            &self.title
        } else {
            &self.jira_id
        }
    }
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Custom fields to send when pushing this task: the parent's fields
    /// overlaid with the task's own, key by key.
    pub fn effective_fields(&self, parent: &Ticket) -> HashMap<String, String> {
        let mut fields = parent.custom_fields.clone();
        for (key, value) in &self.custom_fields {
            fields.insert(key.clone(), value.clone());
        }
        fields
    }
}

/// Check a remote ticket key against the `PROJ-123` shape.
///
/// Keys are embedded verbatim in remote query strings, so anything outside
/// the uppercase-letters, hyphen, digits pattern is rejected.
pub fn is_valid_ticket_id(id: &str) -> bool {
    TICKET_ID_RE.is_match(id)
}

pub fn validate_ticket_id(id: &str) -> Result<()> {
    if is_valid_ticket_id(id) {
        Ok(())
    } else {
        Err(SyncError::InvalidTicketId(id.to_string()))
    }
}
