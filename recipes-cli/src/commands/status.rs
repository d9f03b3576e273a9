//! `recipes cron status` — recorded mappings for one owner.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use recipes_core::{config, MappingEntry, MappingKey, MappingState, Owner};
use recipes_sync::mapping_store;

use super::OwnerArgs;

/// Arguments for `recipes cron status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub owner: OwnerArgs,

    /// Only show jobs of this recipe.
    #[arg(long)]
    pub recipe: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let cfg = config::load_at(&home).context("failed to load recipes config")?;
        let owner = self.owner.owner()?;
        let store_path = config::mapping_path(&cfg.workspace_root_at(&home), &owner);

        let state = mapping_store::load(&store_path);
        let rows = collect_rows(&state, &owner, self.recipe.as_deref());

        if self.json {
            let payload = StatusJson {
                owner: owner.to_string(),
                store: store_path.display().to_string(),
                jobs: rows,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&owner, &store_path, rows);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusRow {
    recipe_id: String,
    job_id: String,
    installed_job_id: String,
    spec_hash: String,
    orphaned: bool,
    updated_at: Option<String>,
    #[serde(skip)]
    updated_age: String,
}

#[derive(Serialize)]
struct StatusJson {
    owner: String,
    store: String,
    jobs: Vec<StatusRow>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "recipe")]
    recipe: String,
    #[tabled(rename = "job")]
    job: String,
    #[tabled(rename = "scheduler id")]
    installed: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "hash")]
    hash: String,
    #[tabled(rename = "updated")]
    updated: String,
}

fn collect_rows(state: &MappingState, owner: &Owner, recipe: Option<&str>) -> Vec<StatusRow> {
    state
        .entries
        .iter()
        .filter_map(|(raw, entry)| MappingKey::decode(raw).map(|key| (key, entry)))
        .filter(|(key, _)| key.owner == *owner)
        .filter(|(key, _)| recipe.map_or(true, |r| key.recipe_id.0 == r))
        .map(|(key, entry)| row(key, entry))
        .collect()
}

fn row(key: MappingKey, entry: &MappingEntry) -> StatusRow {
    let updated = entry.updated_at();
    StatusRow {
        recipe_id: key.recipe_id.0,
        job_id: key.job_id,
        installed_job_id: entry.installed_job_id.clone(),
        spec_hash: entry.spec_hash.clone(),
        orphaned: entry.orphaned,
        updated_at: updated.map(|t| t.to_rfc3339()),
        updated_age: updated.map_or_else(|| "unknown".to_string(), format_age),
    }
}

fn print_table(owner: &Owner, store_path: &std::path::Path, rows: Vec<StatusRow>) {
    println!("{} | {}", owner.to_string().bold(), store_path.display());

    if rows.is_empty() {
        println!("No cron jobs recorded.");
        return;
    }

    let orphaned = rows.iter().filter(|r| r.orphaned).count();
    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|r| StatusTableRow {
            recipe: r.recipe_id,
            job: r.job_id,
            installed: r.installed_job_id,
            state: if r.orphaned {
                "ORPHANED".magenta().to_string()
            } else {
                "ACTIVE".green().to_string()
            },
            hash: r.spec_hash.chars().take(12).collect(),
            updated: r.updated_age,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if orphaned > 0 {
        println!("{}", orphan_note(orphaned));
    }
}

/// A mark is not a scheduler state: the fast path records orphans without
/// listing, so they are disabled by a later pass that sees them enabled.
fn orphan_note(orphaned: usize) -> String {
    format!("{orphaned} job(s) marked orphaned; disabled on the next pass that sees them enabled.")
}

fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0);
    let age = if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 60 * 60 {
        format!("{}m", seconds / 60)
    } else if seconds < 60 * 60 * 24 {
        format!("{}h", seconds / (60 * 60))
    } else {
        format!("{}d", seconds / (60 * 60 * 24))
    };
    format!("{age} ago")
}
