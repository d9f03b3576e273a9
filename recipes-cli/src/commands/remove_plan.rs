//! `recipes cron remove-plan` — which scheduler jobs belong to a team.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use recipes_core::config::{self, SchedulerKind};
use recipes_sync::{plan_team_removal, team_jobs::PlannedJob, RemovalPlan};

use super::validate_owner_id;
use crate::transport;

/// Arguments for `recipes cron remove-plan`.
#[derive(Args, Debug)]
pub struct RemovePlanArgs {
    /// Team whose stamped jobs to look for.
    #[arg(long)]
    pub team: String,

    /// Override the configured scheduler transport (gateway, local).
    #[arg(long)]
    pub scheduler: Option<SchedulerKind>,

    /// Emit the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RemovePlanArgs {
    pub fn run(self) -> Result<()> {
        let team = self.team.trim();
        validate_owner_id(team)?;
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let cfg = config::load_at(&home).context("failed to load recipes config")?;

        let client = transport::connect(self.scheduler.unwrap_or(cfg.scheduler), &cfg, &home);
        let plan = plan_team_removal(client.as_ref(), team)
            .with_context(|| format!("failed to plan removal of team '{team}'"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan")?
            );
            return Ok(());
        }
        print_plan(&plan);
        Ok(())
    }
}

fn print_plan(plan: &RemovalPlan) {
    println!("{}", format!("team:{}", plan.team_id).bold());
    if plan.protected {
        println!("{}", "protected team; removal is refused".yellow());
    }
    if plan.exact.is_empty() && plan.ambiguous.is_empty() {
        println!("No scheduler jobs reference this team.");
        return;
    }
    for job in &plan.exact {
        println!("  {}  {}", "✗".red(), describe(job));
    }
    for job in &plan.ambiguous {
        println!("  {}  {} (review: {})", "?".yellow(), describe(job), job.reason.unwrap_or("-"));
    }
}

fn describe(job: &PlannedJob) -> String {
    match &job.name {
        Some(name) => format!("{} {name}", job.id),
        None => job.id.clone(),
    }
}
