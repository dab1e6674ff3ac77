use std::path::Path;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, connect, error_json, split_outcome};
use crate::config::Config;
use crate::error::Result;
use crate::paths;
use crate::state::StateStore;
use crate::store::YamlTicketFile;
use crate::sync::{PushOptions, PushResult, Reconciler};

/// Push local tickets to the remote system
pub async fn cmd_push(file: &Path, project: Option<&str>, output_json: bool) -> Result<()> {
    let config = Config::load()?;
    let project_key = config.project_key(project)?;
    let client = connect(&config).await?;

    let options = PushOptions {
        path: file.to_path_buf(),
        project_key,
    };

    let mut state = StateStore::new(paths::state_path());
    let mut reconciler = Reconciler::new(&client, &YamlTicketFile, &mut state);

    let mut show_progress = |current: usize, total: usize, message: &str| {
        if !output_json {
            eprintln!("{}", format!("[{current}/{total}] {message}").dimmed());
        }
    };
    let (result, error) = split_outcome(reconciler.push(&options, Some(&mut show_progress)).await);

    CommandOutput::new(json!({
        "action": "push",
        "file": file.display().to_string(),
        "created": result.created,
        "updated": result.updated,
        "unchanged": result.unchanged,
        "failed": result.failed,
        "errors": result.errors,
        "error": error_json(error.as_ref()),
    }))
    .with_text(format_push(&result))
    .print(output_json)?;

    match error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn format_push(result: &PushResult) -> String {
    let mut lines = Vec::new();
    for id in &result.created {
        lines.push(format!("{} {}", "created".green(), id.cyan()));
    }
    for id in &result.updated {
        lines.push(format!("{} {}", "updated".cyan(), id.cyan()));
    }
    for (label, message) in &result.errors {
        lines.push(format!("{} {}: {}", "failed".red(), label, message));
    }
    lines.push(format!(
        "{} created, {} updated, {} unchanged, {} failed",
        result.created.len(),
        result.updated.len(),
        result.unchanged,
        result.failed.len()
    ));
    lines.join("\n")
}
