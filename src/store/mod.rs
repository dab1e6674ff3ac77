//! Local ticket file access.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::types::Ticket;
use crate::utils::write_atomic;

/// Read-all / write-all access to a local ticket file.
pub trait TicketStore: Send + Sync {
    /// Load every ticket in `path`.
    ///
    /// A missing file is reported as [`SyncError::LocalFileNotFound`] so
    /// callers can treat it as "no local tickets yet".
    fn get_tickets(&self, path: &Path) -> Result<Vec<Ticket>>;

    /// Replace the contents of `path` with `tickets`.
    fn save_tickets(&self, path: &Path, tickets: &[Ticket]) -> Result<()>;
}

/// Load tickets, treating a missing file as empty.
pub fn get_tickets_or_empty<S: TicketStore + ?Sized>(store: &S, path: &Path) -> Result<Vec<Ticket>> {
    match store.get_tickets(path) {
        Ok(tickets) => Ok(tickets),
        Err(SyncError::LocalFileNotFound(_)) => {
            tracing::debug!("{} does not exist yet, starting with no local tickets", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TicketFile {
    #[serde(default)]
    tickets: Vec<Ticket>,
}

/// Tickets stored as a YAML document with a top-level `tickets` list.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlTicketFile;

impl TicketStore for YamlTicketFile {
    fn get_tickets(&self, path: &Path) -> Result<Vec<Ticket>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SyncError::LocalFileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: TicketFile = serde_yaml_ng::from_str(&content)?;
        let mut tickets = file.tickets;
        for (index, ticket) in tickets.iter_mut().enumerate() {
            ticket.source_line = index + 1;
            for (task_index, task) in ticket.tasks.iter_mut().enumerate() {
                task.source_line = task_index + 1;
            }
        }
        Ok(tickets)
    }

    fn save_tickets(&self, path: &Path, tickets: &[Ticket]) -> Result<()> {
        let file = TicketFile {
            tickets: tickets.to_vec(),
        };
        let content = serde_yaml_ng::to_string(&file)?;
        write_atomic(path, content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Task;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_typed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tickets.yaml");
        let err = YamlTicketFile.get_tickets(&path).unwrap_err();
        assert!(matches!(err, SyncError::LocalFileNotFound(ref p) if p == &path));
        assert!(get_tickets_or_empty(&YamlTicketFile, &path).unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_preserves_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tickets.yaml");

        let mut ticket = Ticket::new("Search page");
        ticket.jira_id = "WEB-1".to_string();
        ticket.acceptance_criteria = vec!["Finds by title".to_string()];
        ticket
            .custom_fields
            .insert("Priority".to_string(), "High".to_string());
        let mut task = Task::new("Index titles");
        task.jira_id = "WEB-2".to_string();
        ticket.tasks.push(task);
        let draft = Ticket::new("Not yet pushed");

        YamlTicketFile
            .save_tickets(&path, &[ticket.clone(), draft.clone()])
            .unwrap();
        let loaded = YamlTicketFile.get_tickets(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].source_line, 1);
        assert_eq!(loaded[1].source_line, 2);
        assert_eq!(loaded[0].title, ticket.title);
        assert_eq!(loaded[0].custom_fields, ticket.custom_fields);
        assert_eq!(loaded[0].tasks[0].jira_id, "WEB-2");
        assert!(loaded[1].jira_id.is_empty());
    }

    #[test]
    fn test_parse_handwritten_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tickets.yaml");
        fs::write(
            &path,
            r#"
tickets:
  - title: Billing export
    jira_id: FIN-10
    custom_fields:
      Priority: Medium
    tasks:
      - title: CSV writer
"#,
        )
        .unwrap();

        let tickets = YamlTicketFile.get_tickets(&path).unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].jira_id, "FIN-10");
        assert_eq!(tickets[0].tasks[0].title, "CSV writer");
        assert!(tickets[0].description.is_empty());
    }

    #[test]
    fn test_empty_file_has_no_tickets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tickets.yaml");
        fs::write(&path, "").unwrap();
        assert!(YamlTicketFile.get_tickets(&path).unwrap().is_empty());
    }
}
