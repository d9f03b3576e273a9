//! `recipes cron sync` — reconcile a recipe's declared cron jobs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use recipes_core::{
    config::{self, SchedulerKind},
    normalize_cron_jobs, parse_recipe, InstallMode,
};
use recipes_sync::{reconcile, JobAction, ReconcileRequest, ReconcileSummary, SkipReason};

use super::OwnerArgs;
use crate::prompt::TerminalPrompter;
use crate::transport;

/// Arguments for `recipes cron sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Recipe markdown file with YAML front matter.
    pub recipe: PathBuf,

    #[command(flatten)]
    pub owner: OwnerArgs,

    /// Override `cron_installation` from the config (off, prompt, on).
    #[arg(long)]
    pub mode: Option<InstallMode>,

    /// Override the configured scheduler transport (gateway, local).
    #[arg(long)]
    pub scheduler: Option<SchedulerKind>,

    /// Override the configured gateway URL.
    #[arg(long)]
    pub gateway_url: Option<String>,

    /// Override the scheduler jobs file used by `--scheduler local`.
    #[arg(long)]
    pub jobs_file: Option<PathBuf>,

    /// Report what would change without creating, updating, or saving anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the machine-readable summary.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let mut cfg = config::load_at(&home).context("failed to load recipes config")?;
        if let Some(url) = self.gateway_url.clone() {
            cfg.gateway.url = url;
        }
        if let Some(path) = self.jobs_file.clone() {
            cfg.local_jobs_path = Some(path);
        }

        let markdown = std::fs::read_to_string(&self.recipe)
            .with_context(|| format!("failed to read recipe {}", self.recipe.display()))?;
        let recipe = parse_recipe(&markdown)
            .with_context(|| format!("invalid recipe {}", self.recipe.display()))?;
        let jobs = normalize_cron_jobs(recipe.cron_jobs())
            .with_context(|| format!("recipe '{}' declares invalid cron jobs", recipe.id))?;

        let owner = self.owner.owner()?;
        let store_path = config::mapping_path(&cfg.workspace_root_at(&home), &owner);
        let mode = self.mode.unwrap_or(cfg.cron_installation);
        let scheduler = self.scheduler.unwrap_or(cfg.scheduler);
        tracing::info!(
            "reconciling {} cron job(s) of '{}' for {owner} (mode {mode}, scheduler {scheduler})",
            jobs.len(),
            recipe.id
        );

        let client = transport::connect(scheduler, &cfg, &home);
        let req = ReconcileRequest {
            owner: &owner,
            recipe_id: &recipe.id,
            jobs: &jobs,
            mode,
            store_path: &store_path,
            dry_run: self.dry_run,
        };
        let summary = reconcile(&req, client.as_ref(), &TerminalPrompter)
            .with_context(|| format!("cron sync failed for recipe '{}'", recipe.id))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize summary")?
            );
            return Ok(());
        }
        print_summary(&recipe.id.0, &summary);
        Ok(())
    }
}

fn print_summary(recipe_id: &str, summary: &ReconcileSummary) {
    let prefix = if summary.dry_run { "[dry-run] " } else { "" };

    if let Some(reason) = summary.reason {
        println!("{prefix}· '{recipe_id}' cron jobs skipped: {}", skip_detail(reason));
        return;
    }

    let c = &summary.counts;
    if !summary.changed {
        println!("{prefix}✓ '{recipe_id}' cron jobs — nothing to do ({} unchanged)", c.unchanged);
    } else {
        println!(
            "{prefix}✓ '{recipe_id}' cron jobs reconciled ({} created, {} updated, {} unchanged, {} disabled, {} removed)",
            c.created, c.updated, c.unchanged, c.disabled, c.disabled_removed
        );
    }

    for job in &summary.jobs {
        let id = job.installed_job_id.as_deref().unwrap_or("-");
        let state = if job.enabled {
            "enabled".green().to_string()
        } else {
            "disabled".bright_black().to_string()
        };
        println!("  {}  {} ({id}, {state})", action_symbol(job.action), job.job_id);
    }
    for removed in &summary.removed {
        println!(
            "  {}  {} ({}, removed from recipe)",
            "✗".red(),
            removed.job_id,
            removed.installed_job_id
        );
    }

    if !summary.opted_in {
        println!("Jobs were left disabled. Re-run with --mode on to enable them.");
    }
}

fn action_symbol(action: JobAction) -> String {
    match action {
        JobAction::Created => "+".green().bold().to_string(),
        JobAction::Updated => "✎".yellow().to_string(),
        JobAction::Unchanged => "·".to_string(),
        JobAction::Disabled => "⏸".bright_black().to_string(),
    }
}

fn skip_detail(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoJobs => "recipe declares no cron jobs",
        SkipReason::ModeOff => "cron installation is off",
        SkipReason::Declined => "declined at the prompt",
    }
}
