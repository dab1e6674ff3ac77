//! Remote issue tracker access.
//!
//! The reconciler and bulk executor only talk to the remote system through
//! [`RemoteClient`]; [`jira::JiraClient`] is the production implementation.

pub mod error;
pub mod jira;
pub mod query;

use std::fmt;
use std::future::Future;

use crate::error::{Result, SyncError};
use crate::types::{Task, Ticket};

pub use jira::JiraClient;

/// Optional operations a remote client may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Delete,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Delete => write!(f, "delete"),
        }
    }
}

/// Common interface for remote ticket systems.
///
/// Every call may fail independently; callers decide whether a failure
/// aborts their run or is recorded per ticket.
pub trait RemoteClient: Send + Sync {
    /// Verify credentials against the remote system
    fn authenticate(&self) -> impl Future<Output = Result<()>> + Send;

    /// Fetch every ticket matching `query`, including its tasks.
    ///
    /// Pagination is handled internally.
    fn search_tickets(
        &self,
        project_key: &str,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Ticket>>> + Send;

    /// Create a ticket and return its new remote key
    fn create_ticket(
        &self,
        project_key: &str,
        ticket: &Ticket,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Overwrite the remote ticket named by `ticket.jira_id`
    fn update_ticket(&self, ticket: &Ticket) -> impl Future<Output = Result<()>> + Send;

    /// Create a task under `parent_id` and return its new remote key
    fn create_task(
        &self,
        project_key: &str,
        parent_id: &str,
        task: &Task,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Overwrite the remote task named by `task.jira_id`
    fn update_task(&self, task: &Task) -> impl Future<Output = Result<()>> + Send;

    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    /// Delete a ticket. Only meaningful when [`Capability::Delete`] is supported.
    fn delete_ticket(&self, _id: &str) -> impl Future<Output = Result<()>> + Send {
        async { Err(SyncError::Unsupported("delete")) }
    }
}
