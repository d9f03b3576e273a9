//! Recipes — install and reconcile the cron jobs a recipe declares.
//!
//! # Usage
//!
//! ```text
//! recipes cron sync <recipe.md> --team <id> | --agent <id> [--mode off|prompt|on]
//!                   [--scheduler gateway|local] [--gateway-url <url>] [--jobs-file <path>]
//!                   [--dry-run] [--json]
//! recipes cron status --team <id> | --agent <id> [--recipe <id>] [--json]
//! recipes config show
//! recipes config set <key> <value>
//! ```

mod commands;
mod prompt;
mod transport;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, CronCommand};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "recipes",
    version,
    about = "Install recipe-declared cron jobs into the scheduler and keep them in step",
    long_about = None,
)]
struct Cli {
    /// Log reconciliation actions to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile or inspect recipe cron jobs.
    Cron {
        #[command(subcommand)]
        command: CronCommand,
    },

    /// Show or change operator configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Cron { command } => commands::run_cron(command),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
