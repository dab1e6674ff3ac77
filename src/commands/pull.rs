use std::path::PathBuf;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, connect, error_json, split_outcome};
use crate::config::Config;
use crate::error::Result;
use crate::paths;
use crate::state::StateStore;
use crate::store::YamlTicketFile;
use crate::sync::{PullOptions, PullResult, Reconciler, Strategy};

/// Options for the `pull` command
pub struct PullArgs {
    pub file: PathBuf,
    pub project: Option<String>,
    pub jql: Option<String>,
    pub epic: Option<String>,
    pub force: bool,
    pub strategy: Option<Strategy>,
}

/// Pull remote tickets into a local ticket file
pub async fn cmd_pull(args: PullArgs, output_json: bool) -> Result<()> {
    let config = Config::load()?;
    let project_key = config.project_key(args.project.as_deref())?;
    let client = connect(&config).await?;

    let options = PullOptions {
        path: args.file.clone(),
        project_key,
        filter: args.jql,
        parent: args.epic,
        force: args.force,
        strategy: args.strategy.or(config.conflict_strategy),
    };

    let mut state = StateStore::new(paths::state_path());
    let mut reconciler = Reconciler::new(&client, &YamlTicketFile, &mut state);

    let mut show_progress = |current: usize, total: usize, message: &str| {
        if !output_json && total > 0 {
            eprintln!("{}", format!("[{current}/{total}] {message}").dimmed());
        }
    };
    let (result, error) = split_outcome(reconciler.pull(&options, Some(&mut show_progress)).await);

    CommandOutput::new(json!({
        "action": "pull",
        "file": args.file.display().to_string(),
        "pulled": result.pulled,
        "updated": result.updated,
        "skipped": result.skipped,
        "local_only": result.local_only,
        "conflicts": result.conflicts,
        "error": error_json(error.as_ref()),
    }))
    .with_text(format_pull(&result, options.force))
    .print(output_json)?;

    match error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn format_pull(result: &PullResult, force: bool) -> String {
    let mut text = format!(
        "Pulled {} new, {} updated, {} unchanged",
        result.pulled.to_string().green(),
        result.updated.to_string().cyan(),
        result.skipped
    );
    if result.local_only > 0 {
        text.push_str(&format!(", {} local only", result.local_only));
    }
    if !result.conflicts.is_empty() {
        let heading = if force {
            "Overwritten with remote content:"
        } else {
            "Conflicts (local version kept):"
        };
        text.push_str(&format!("\n{}", heading.yellow()));
        for id in &result.conflicts {
            text.push_str(&format!("\n  {}", id.yellow()));
        }
    }
    text
}
