use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, connect, error_json, split_outcome};
use crate::bulk::{
    BulkAction, BulkExecutor, BulkOperation, BulkOperationResult, CancelFlag, FieldValue,
    MOVE_PARENT_KEY,
};
use crate::config::Config;
use crate::error::{Result, SyncError};

/// Options for the `bulk` commands
pub struct BulkOptions {
    pub action: BulkAction,
    pub ticket_ids: Vec<String>,
    /// Field changes for `update`
    pub changes: Vec<(String, FieldValue)>,
    /// Target parent for `move`
    pub parent: Option<String>,
    pub project: Option<String>,
}

impl BulkOptions {
    fn to_operation(&self) -> BulkOperation {
        let mut operation = BulkOperation::new(self.action, self.ticket_ids.clone());
        operation.changes.extend(self.changes.iter().cloned());
        if let Some(parent) = &self.parent {
            operation
                .changes
                .insert(MOVE_PARENT_KEY.to_string(), FieldValue::Text(parent.clone()));
        }
        operation
    }
}

/// Apply one change across many remote tickets
pub async fn cmd_bulk(options: BulkOptions, output_json: bool) -> Result<()> {
    // Reject malformed requests before touching configuration or the network.
    let validated = options.to_operation().validate()?;

    let config = Config::load()?;
    let project_key = match config.project_key(options.project.as_deref()) {
        Ok(key) => key,
        Err(_) => project_of(&validated.ticket_ids()[0]).to_string(),
    };
    let client = connect(&config).await?;

    let cancel = CancelFlag::new();
    let on_interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping after the current ticket");
                cancel.cancel();
            }
        })
    };

    let executor = BulkExecutor::new(&client, project_key);
    let mut show_progress = |id: &str, success: bool, error: Option<&SyncError>| {
        if output_json {
            return;
        }
        if success {
            eprintln!("{} {}", "✓".green(), id);
        } else if let Some(e) = error {
            eprintln!("{} {}: {}", "✗".red(), id, e);
        }
    };
    let outcome = executor
        .execute(&validated, &cancel, Some(&mut show_progress))
        .await;
    on_interrupt.abort();
    let (result, error) = split_outcome(outcome);

    CommandOutput::new(json!({
        "action": validated.action().as_str(),
        "success_count": result.success_count,
        "failure_count": result.failure_count,
        "successful_tickets": result.successful_tickets,
        "failed_tickets": result.failed_tickets,
        "errors": result.errors,
        "rolled_back": result.rolled_back,
        "cancelled": matches!(error, Some(SyncError::Cancelled)),
        "error": error_json(error.as_ref()),
    }))
    .with_text(format_bulk(validated.action(), &result))
    .print(output_json)?;

    match error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Project key prefix of a ticket ID (`PROJ` for `PROJ-12`).
fn project_of(id: &str) -> &str {
    id.split_once('-').map_or(id, |(project, _)| project)
}

fn format_bulk(action: BulkAction, result: &BulkOperationResult) -> String {
    let mut text = format!(
        "{}: {} succeeded, {} failed",
        action,
        result.success_count.to_string().green(),
        result.failure_count.to_string().red()
    );
    if !result.rolled_back.is_empty() {
        text.push_str(&format!(
            "\nRolled back: {}",
            result.rolled_back.join(", ").yellow()
        ));
    }
    text
}

/// Parse a `FIELD=VALUE` change argument
pub fn parse_change(s: &str) -> std::result::Result<(String, FieldValue), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid change '{s}', expected FIELD=VALUE"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("invalid change '{s}', field name is empty"));
    }
    let value = match value.parse::<FieldValue>() {
        Ok(value) => value,
        Err(never) => match never {},
    };
    Ok((field.to_string(), value))
}
