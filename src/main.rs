use clap::Parser;
use owo_colors::OwoColorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ticketsync::cli::Cli;

/// Log filter from `TICKETSYNC_LOG`, falling back to `debug` with `-v` and
/// `warn` otherwise. Logs go to stderr so `--json` output stays parseable.
fn init_logging(verbose: bool) {
    let default = if verbose { "ticketsync=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("TICKETSYNC_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            ExitCode::FAILURE
        }
    }
}
