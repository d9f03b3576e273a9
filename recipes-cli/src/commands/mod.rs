pub mod config;
pub mod remove_plan;
pub mod status;
pub mod sync;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use recipes_core::Owner;

use remove_plan::RemovePlanArgs;
use status::StatusArgs;
use sync::SyncArgs;

/// `recipes cron` subcommands.
#[derive(Subcommand, Debug)]
pub enum CronCommand {
    /// Install, update, and disable the cron jobs a recipe declares.
    Sync(SyncArgs),

    /// Show the recorded recipe-job to scheduler-job mappings of an owner.
    Status(StatusArgs),

    /// List the scheduler jobs stamped with a team's id.
    RemovePlan(RemovePlanArgs),
}

pub fn run_cron(command: CronCommand) -> Result<()> {
    match command {
        CronCommand::Sync(args) => args.run(),
        CronCommand::Status(args) => args.run(),
        CronCommand::RemovePlan(args) => args.run(),
    }
}

/// Exactly one of `--team` / `--agent`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct OwnerArgs {
    /// Team that owns the jobs (mappings live in `workspace-<team>/notes`).
    #[arg(long)]
    pub team: Option<String>,

    /// Agent that owns the jobs (mappings live in `agents/<agent>/notes`).
    #[arg(long)]
    pub agent: Option<String>,
}

impl OwnerArgs {
    pub fn owner(&self) -> Result<Owner> {
        let owner = match (&self.team, &self.agent) {
            (Some(team), None) => Owner::team(team.trim()),
            (None, Some(agent)) => Owner::agent(agent.trim()),
            _ => bail!("provide exactly one of --team or --agent"),
        };
        validate_owner_id(&owner.id)?;
        Ok(owner)
    }
}

/// Owner ids become directory names.
pub(crate) fn validate_owner_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("owner id must not be empty");
    }
    if id == "." || id == ".." || id.contains(['/', '\\']) {
        bail!("owner id '{id}' must be a plain name, not a path");
    }
    Ok(())
}
