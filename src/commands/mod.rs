mod bulk;
mod pull;
mod push;
mod status;

pub use bulk::{BulkOptions, cmd_bulk, parse_change};
pub use pull::{PullArgs, cmd_pull};
pub use push::cmd_push;
pub use status::cmd_status;

use serde_json::Value;

use crate::config::Config;
use crate::error::{Outcome, Result, SyncError};
use crate::remote::{JiraClient, RemoteClient};

/// Output of a command: a JSON document plus an optional human-readable form.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Print JSON when requested, otherwise the text form (falling back to JSON).
    pub fn print(self, output_json: bool) -> Result<()> {
        match (output_json, self.text) {
            (false, Some(text)) => {
                println!("{text}");
                Ok(())
            }
            _ => print_json(&self.json),
        }
    }
}

/// Print a JSON value to stdout
pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Separate the result of an operation from the reason it stopped short.
pub(crate) fn split_outcome<T>(outcome: Outcome<T>) -> (T, Option<SyncError>) {
    match outcome {
        Ok(value) => (value, None),
        Err(incomplete) => (incomplete.partial, Some(incomplete.cause)),
    }
}

/// Build a Jira client from configuration and check its credentials.
pub(crate) async fn connect(config: &Config) -> Result<JiraClient> {
    let client = JiraClient::from_config(config)?;
    client.authenticate().await?;
    tracing::debug!("authenticated against Jira");
    Ok(client)
}

pub(crate) fn error_json(error: Option<&SyncError>) -> Value {
    error.map_or(Value::Null, |e| Value::String(e.to_string()))
}
