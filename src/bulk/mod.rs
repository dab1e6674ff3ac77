//! Multi-ticket mutations applied against the remote system.
//!
//! A [`BulkOperation`] is validated into a [`ValidatedOperation`] before any
//! remote call is made; [`BulkExecutor`] then applies it ticket by ticket.

mod executor;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::types::{MAX_BULK_TICKETS, is_valid_ticket_id};

pub use executor::{BulkExecutor, BulkProgress};

/// Key in [`BulkOperation::changes`] naming the new parent for a move.
pub const MOVE_PARENT_KEY: &str = "parent";

/// Message recorded per ticket when the remote cannot delete.
pub const DELETE_UNSUPPORTED: &str = "delete operation not supported by remote";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Update,
    Move,
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Update => "update",
            BulkAction::Move => "move",
            BulkAction::Delete => "delete",
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkAction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "update" => Ok(BulkAction::Update),
            "move" => Ok(BulkAction::Move),
            "delete" => Ok(BulkAction::Delete),
            other => Err(SyncError::InvalidBulkOperation(format!(
                "unknown action '{other}', expected update, move or delete"
            ))),
        }
    }
}

/// A value in a bulk change set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(serde_json::Number),
    Structured(serde_json::Value),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(number) => write!(f, "{number}"),
            FieldValue::Structured(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl FromStr for FieldValue {
    type Err = std::convert::Infallible;

    /// Numbers and JSON objects/arrays keep their type; everything else is text.
    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Ok(number) = trimmed.parse::<serde_json::Number>() {
            return Ok(FieldValue::Number(number));
        }
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed)
        {
            return Ok(FieldValue::Structured(value));
        }
        Ok(FieldValue::Text(raw.to_string()))
    }
}

/// A caller-built bulk request, not yet checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    pub action: BulkAction,
    pub ticket_ids: Vec<String>,
    #[serde(default)]
    pub changes: HashMap<String, FieldValue>,
}

impl BulkOperation {
    pub fn new(action: BulkAction, ticket_ids: Vec<String>) -> Self {
        Self {
            action,
            ticket_ids,
            changes: HashMap::new(),
        }
    }

    pub fn with_change(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.changes.insert(field.into(), value.into());
        self
    }

    /// Check the request and resolve its change values to strings.
    pub fn validate(&self) -> Result<ValidatedOperation> {
        if self.ticket_ids.is_empty() {
            return Err(SyncError::InvalidBulkOperation(
                "at least one ticket ID is required".to_string(),
            ));
        }
        if self.ticket_ids.len() > MAX_BULK_TICKETS {
            return Err(SyncError::InvalidBulkOperation(format!(
                "too many tickets: {} (maximum {MAX_BULK_TICKETS})",
                self.ticket_ids.len()
            )));
        }
        let mut seen = HashSet::new();
        for id in &self.ticket_ids {
            if id.is_empty() {
                return Err(SyncError::InvalidBulkOperation(
                    "ticket ID cannot be empty".to_string(),
                ));
            }
            if !is_valid_ticket_id(id) {
                return Err(SyncError::InvalidTicketId(id.clone()));
            }
            if !seen.insert(id.as_str()) {
                return Err(SyncError::InvalidBulkOperation(format!(
                    "ticket {id} is listed more than once"
                )));
            }
        }

        let mutation = match self.action {
            BulkAction::Update => {
                if self.changes.is_empty() {
                    return Err(SyncError::InvalidBulkOperation(
                        "update requires at least one change".to_string(),
                    ));
                }
                let fields = self
                    .changes
                    .iter()
                    .map(|(field, value)| (field.clone(), value.to_string()))
                    .collect();
                Mutation::Fields(fields)
            }
            BulkAction::Move => {
                let parent = self
                    .changes
                    .get(MOVE_PARENT_KEY)
                    .map(|value| value.to_string())
                    .filter(|parent| !parent.trim().is_empty())
                    .ok_or(SyncError::MissingMoveParent)?;
                Mutation::Reparent(parent)
            }
            BulkAction::Delete => Mutation::Delete,
        };

        Ok(ValidatedOperation {
            ticket_ids: self.ticket_ids.clone(),
            mutation,
        })
    }
}

/// What a validated operation does to each ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Set each custom field to its resolved value
    Fields(BTreeMap<String, String>),
    /// Set the parent field
    Reparent(String),
    Delete,
}

/// A bulk request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOperation {
    ticket_ids: Vec<String>,
    mutation: Mutation,
}

impl ValidatedOperation {
    pub fn ticket_ids(&self) -> &[String] {
        &self.ticket_ids
    }

    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    pub fn action(&self) -> BulkAction {
        match self.mutation {
            Mutation::Fields(_) => BulkAction::Update,
            Mutation::Reparent(_) => BulkAction::Move,
            Mutation::Delete => BulkAction::Delete,
        }
    }
}

/// Per-ticket accounting for one bulk execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOperationResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub successful_tickets: Vec<String>,
    pub failed_tickets: Vec<String>,
    pub errors: BTreeMap<String, String>,
    /// Successful tickets restored to their snapshot after a partial failure
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rolled_back: Vec<String>,
}

impl BulkOperationResult {
    pub fn record_success(&mut self, id: &str) {
        self.success_count += 1;
        self.successful_tickets.push(id.to_string());
    }

    pub fn record_failure(&mut self, id: &str, message: impl Into<String>) {
        self.failure_count += 1;
        self.failed_tickets.push(id.to_string());
        self.errors.insert(id.to_string(), message.into());
    }

    pub fn processed(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// Cooperative cancellation shared between the executor and a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
