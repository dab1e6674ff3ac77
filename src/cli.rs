use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;

use crate::bulk::{BulkAction, FieldValue};
use crate::commands::parse_change;
use crate::sync::Strategy;

#[derive(Parser)]
#[command(name = "ticketsync")]
#[command(about = "Synchronize a local ticket file with Jira")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging on stderr (overridden by TICKETSYNC_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull remote tickets into a local ticket file
    Pull {
        /// Local ticket file (YAML)
        file: PathBuf,

        /// Project key (default: `project` from config)
        #[arg(short, long)]
        project: Option<String>,

        /// Additional JQL clause ANDed onto the project filter
        #[arg(long)]
        jql: Option<String>,

        /// Only pull children of this epic or parent ticket
        #[arg(long)]
        epic: Option<String>,

        /// Overwrite local edits with remote content when both sides changed
        #[arg(long, conflicts_with = "strategy")]
        force: bool,

        /// Conflict strategy: local-wins, remote-wins, three-way
        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<Strategy>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Push local tickets to Jira, creating those without a key
    Push {
        /// Local ticket file (YAML)
        file: PathBuf,

        /// Project key for new tickets (default: `project` from config)
        #[arg(short, long)]
        project: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which local tickets changed since the last sync
    Status {
        /// Local ticket file (YAML)
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply one change to many remote tickets
    Bulk {
        #[command(subcommand)]
        action: BulkCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for [possible values: bash, zsh, fish, powershell, elvish]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum BulkCommand {
    /// Set custom fields on every listed ticket
    Update {
        /// Ticket keys (e.g. PROJ-123), at most 100
        #[arg(required = true)]
        ids: Vec<String>,

        /// Field change as FIELD=VALUE, can be repeated
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_change, action = clap::ArgAction::Append)]
        changes: Vec<(String, FieldValue)>,

        /// Project key used for lookups (default: config, then the first key's prefix)
        #[arg(short, long)]
        project: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move every listed ticket under a new parent
    Move {
        /// Ticket keys (e.g. PROJ-123), at most 100
        #[arg(required = true)]
        ids: Vec<String>,

        /// New parent ticket key
        #[arg(long)]
        parent: Option<String>,

        /// Project key used for lookups (default: config, then the first key's prefix)
        #[arg(short, long)]
        project: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every listed ticket
    Delete {
        /// Ticket keys (e.g. PROJ-123), at most 100
        #[arg(required = true)]
        ids: Vec<String>,

        /// Project key used for lookups (default: config, then the first key's prefix)
        #[arg(short, long)]
        project: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_strategy(s: &str) -> Result<Strategy, String> {
    s.parse().map_err(|e: crate::error::SyncError| e.to_string())
}

impl Cli {
    pub async fn run(self) -> crate::error::Result<()> {
        use crate::commands::{BulkOptions, PullArgs, cmd_bulk, cmd_pull, cmd_push, cmd_status};

        match self.command {
            Commands::Pull {
                file,
                project,
                jql,
                epic,
                force,
                strategy,
                json,
            } => {
                cmd_pull(
                    PullArgs {
                        file,
                        project,
                        jql,
                        epic,
                        force,
                        strategy,
                    },
                    json,
                )
                .await
            }

            Commands::Push {
                file,
                project,
                json,
            } => cmd_push(&file, project.as_deref(), json).await,

            Commands::Status { file, json } => cmd_status(&file, json),

            Commands::Bulk { action } => {
                let (options, json) = match action {
                    BulkCommand::Update {
                        ids,
                        changes,
                        project,
                        json,
                    } => (
                        BulkOptions {
                            action: BulkAction::Update,
                            ticket_ids: ids,
                            changes,
                            parent: None,
                            project,
                        },
                        json,
                    ),
                    BulkCommand::Move {
                        ids,
                        parent,
                        project,
                        json,
                    } => (
                        BulkOptions {
                            action: BulkAction::Move,
                            ticket_ids: ids,
                            changes: Vec::new(),
                            parent,
                            project,
                        },
                        json,
                    ),
                    BulkCommand::Delete { ids, project, json } => (
                        BulkOptions {
                            action: BulkAction::Delete,
                            ticket_ids: ids,
                            changes: Vec::new(),
                            parent: None,
                            project,
                        },
                        json,
                    ),
                };
                cmd_bulk(options, json).await
            }

            Commands::Completions { shell } => {
                generate_completions(shell);
                Ok(())
            }
        }
    }
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "ticketsync", &mut io::stdout());
}
