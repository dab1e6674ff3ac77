//! Conflict-resolution policies for tickets changed on both sides.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::types::{Task, Ticket};

/// A stateless policy deciding what to keep when local and remote diverge.
pub trait ConflictResolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a remote ticket should be considered for sync at all.
    ///
    /// Sync is driven by remote changes, so this only looks at the remote
    /// side for every policy.
    fn should_sync(
        &self,
        _local_hash: &str,
        remote_hash: &str,
        _stored_local_hash: &str,
        stored_remote_hash: &str,
    ) -> bool {
        remote_hash != stored_remote_hash
    }

    /// Produce the ticket to keep, or fail with [`SyncError::UnresolvableConflict`].
    fn resolve_conflict(&self, local: &Ticket, remote: &Ticket) -> Result<Ticket>;
}

/// Keep the local ticket untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalWins;

impl ConflictResolver for LocalWins {
    fn name(&self) -> &'static str {
        "local-wins"
    }

    fn resolve_conflict(&self, local: &Ticket, _remote: &Ticket) -> Result<Ticket> {
        Ok(local.clone())
    }
}

/// Take the remote ticket wholesale.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteWins;

impl ConflictResolver for RemoteWins {
    fn name(&self) -> &'static str {
        "remote-wins"
    }

    fn resolve_conflict(&self, _local: &Ticket, remote: &Ticket) -> Result<Ticket> {
        Ok(remote.clone())
    }
}

/// Field-by-field merge of the two sides.
///
/// There is no common ancestor to compare against, so a differing field is
/// only resolved when one side left it empty. Anything else is reported as
/// a conflict and the whole merge fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMerge;

impl ConflictResolver for FieldMerge {
    fn name(&self) -> &'static str {
        "three-way"
    }

    fn resolve_conflict(&self, local: &Ticket, remote: &Ticket) -> Result<Ticket> {
        let mut merged = local.clone();
        let mut conflicts = Vec::new();

        if let Some(title) = merge_text(&local.title, &remote.title, "Title", &mut conflicts) {
            merged.title = title;
        }
        if let Some(description) = merge_text(
            &local.description,
            &remote.description,
            "Description",
            &mut conflicts,
        ) {
            merged.description = description;
        }

        if local.acceptance_criteria != remote.acceptance_criteria {
            if local.acceptance_criteria.is_empty() {
                merged.acceptance_criteria = remote.acceptance_criteria.clone();
            } else if !remote.acceptance_criteria.is_empty() {
                conflicts.push("AcceptanceCriteria".to_string());
            }
        }

        merged.custom_fields =
            merge_custom_fields(&local.custom_fields, &remote.custom_fields, &mut conflicts);
        merged.tasks = merge_tasks(&local.tasks, &remote.tasks, &mut conflicts);

        if !conflicts.is_empty() {
            let ticket = if remote.jira_id.is_empty() {
                &local.jira_id
            } else {
                &remote.jira_id
            };
            return Err(SyncError::UnresolvableConflict {
                ticket: (!ticket.is_empty()).then(|| ticket.clone()),
                fields: conflicts,
            });
        }

        merged.jira_id = remote.jira_id.clone();
        Ok(merged)
    }
}

/// Returns the value to take when it differs from local, recording a
/// conflict when both sides are non-empty.
fn merge_text(local: &str, remote: &str, field: &str, conflicts: &mut Vec<String>) -> Option<String> {
    if local == remote {
        return None;
    }
    if local.is_empty() {
        return Some(remote.to_string());
    }
    if !remote.is_empty() {
        conflicts.push(field.to_string());
    }
    None
}

fn merge_custom_fields(
    local: &HashMap<String, String>,
    remote: &HashMap<String, String>,
    conflicts: &mut Vec<String>,
) -> HashMap<String, String> {
    let mut merged = local.clone();
    let mut clashing = Vec::new();

    for (key, remote_value) in remote {
        match local.get(key) {
            None => {
                merged.insert(key.clone(), remote_value.clone());
            }
            Some(local_value) if local_value == remote_value => {}
            Some(_) => {
                clashing.push(key.clone());
                merged.insert(key.clone(), remote_value.clone());
            }
        }
    }

    clashing.sort();
    conflicts.extend(clashing.into_iter().map(|key| format!("CustomFields[{key}]")));
    merged
}

fn merge_tasks(local: &[Task], remote: &[Task], conflicts: &mut Vec<String>) -> Vec<Task> {
    let remote_by_id: HashMap<&str, &Task> = remote
        .iter()
        .filter(|task| !task.jira_id.is_empty())
        .map(|task| (task.jira_id.as_str(), task))
        .collect();

    let mut merged = Vec::with_capacity(local.len().max(remote.len()));
    for local_task in local {
        let counterpart = if local_task.jira_id.is_empty() {
            None
        } else {
            remote_by_id.get(local_task.jira_id.as_str()).copied()
        };

        match counterpart {
            None => merged.push(local_task.clone()),
            Some(remote_task) if tasks_conflict(local_task, remote_task) => {
                conflicts.push(format!("Task[{}]", local_task.jira_id));
                merged.push(remote_task.clone());
            }
            Some(remote_task) => {
                let mut task = local_task.clone();
                for (key, value) in &remote_task.custom_fields {
                    task.custom_fields
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
                merged.push(task);
            }
        }
    }

    for remote_task in remote {
        let known_locally = local
            .iter()
            .any(|task| !task.jira_id.is_empty() && task.jira_id == remote_task.jira_id);
        if !known_locally {
            merged.push(remote_task.clone());
        }
    }

    merged
}

/// Tasks conflict on any differing field, whether or not one side is empty.
fn tasks_conflict(local: &Task, remote: &Task) -> bool {
    if local.title != remote.title
        || local.description != remote.description
        || local.acceptance_criteria != remote.acceptance_criteria
    {
        return true;
    }
    local.custom_fields.iter().any(|(key, value)| {
        remote
            .custom_fields
            .get(key)
            .is_some_and(|remote_value| remote_value != value)
    })
}

/// Named conflict-resolution policy, selectable from config or the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    LocalWins,
    RemoteWins,
    #[serde(alias = "merge", alias = "field-merge")]
    ThreeWay,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::LocalWins, Strategy::RemoteWins, Strategy::ThreeWay];

    pub fn resolver(self) -> &'static dyn ConflictResolver {
        match self {
            Strategy::LocalWins => &LocalWins,
            Strategy::RemoteWins => &RemoteWins,
            Strategy::ThreeWay => &FieldMerge,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.resolver().name()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local-wins" | "local" => Ok(Strategy::LocalWins),
            "remote-wins" | "remote" => Ok(Strategy::RemoteWins),
            "three-way" | "merge" | "field-merge" => Ok(Strategy::ThreeWay),
            _ => Err(SyncError::UnknownStrategy(s.to_string())),
        }
    }
}
