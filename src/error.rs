use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("remote ticket not found: {0}")]
    RemoteTicketNotFound(String),

    #[error("ticket file not found: {}", .0.display())]
    LocalFileNotFound(PathBuf),

    #[error("invalid ticket ID '{0}': expected format PROJ-123")]
    InvalidTicketId(String),

    #[error("invalid bulk operation: {0}")]
    InvalidBulkOperation(String),

    #[error("move operation requires a non-empty 'parent' change")]
    MissingMoveParent,

    #[error("custom field '{0}' has no Jira field ID; map it under `jira.fields` in config")]
    UnmappedField(String),

    #[error("operation not supported by remote: {0}")]
    Unsupported(&'static str),

    #[error("unknown conflict strategy '{0}', expected local-wins, remote-wins or three-way")]
    UnknownStrategy(String),

    #[error("conflicts detected for tickets: {}", .0.join(", "))]
    ConflictsDetected(Vec<String>),

    #[error("unresolvable conflict in {}: {}", ticket_label(.ticket), .fields.join(", "))]
    UnresolvableConflict {
        ticket: Option<String>,
        fields: Vec<String>,
    },

    #[error("bulk operation partially failed: {succeeded} succeeded, {failed} failed")]
    PartialFailure { succeeded: usize, failed: usize },

    #[error("bulk operation failed for all {0} tickets")]
    AllFailed(usize),

    #[error("push failed for {0} ticket(s)")]
    PushFailed(usize),

    #[error("operation cancelled")]
    Cancelled,
}

fn ticket_label(ticket: &Option<String>) -> String {
    match ticket {
        Some(id) => format!("ticket {id}"),
        None => "ticket".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// An operation that stopped short of completion.
///
/// Carries whatever was accomplished before the failure so callers can
/// inspect partial progress alongside the cause.
#[derive(Debug)]
pub struct Incomplete<T> {
    pub partial: T,
    pub cause: SyncError,
}

impl<T> Incomplete<T> {
    pub fn new(partial: T, cause: SyncError) -> Self {
        Self { partial, cause }
    }
}

impl<T: Default> From<SyncError> for Incomplete<T> {
    fn from(cause: SyncError) -> Self {
        Self::new(T::default(), cause)
    }
}

impl<T> fmt::Display for Incomplete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl<T: fmt::Debug> std::error::Error for Incomplete<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Result of an operation that may finish with only part of its work done.
pub type Outcome<T> = std::result::Result<T, Incomplete<T>>;
