//! `recipes config` — inspect and edit `~/.recipes/config.yaml`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use recipes_core::config::{self, RecipesConfig};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration, defaults filled in.
    Show,

    /// Set one configuration key and save.
    ///
    /// Keys: cron_installation, scheduler, workspace_root, local_jobs_path,
    /// gateway.url, gateway.token, gateway.timeout_secs.
    Set {
        key: String,
        value: String,
    },
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
    match command {
        ConfigCommand::Show => {
            let cfg = config::load_at(&home).context("failed to load recipes config")?;
            print!("{}", render(&cfg, &home));
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_at(&home).context("failed to load recipes config")?;
            apply(&mut cfg, &key, &value)?;
            config::save_at(&home, &cfg).context("failed to save recipes config")?;
            println!("✓ {key} = {value}");
            Ok(())
        }
    }
}

fn apply(cfg: &mut RecipesConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "cron_installation" => cfg.cron_installation = value.parse().map_err(anyhow::Error::msg)?,
        "scheduler" => cfg.scheduler = value.parse().map_err(anyhow::Error::msg)?,
        "workspace_root" => cfg.workspace_root = Some(PathBuf::from(value)),
        "local_jobs_path" => cfg.local_jobs_path = Some(PathBuf::from(value)),
        "gateway.url" => cfg.gateway.url = value.trim().to_string(),
        "gateway.token" => {
            cfg.gateway.token = Some(value.trim().to_string()).filter(|t| !t.is_empty())
        }
        "gateway.timeout_secs" => {
            cfg.gateway.timeout_secs = value
                .trim()
                .parse()
                .with_context(|| format!("invalid timeout '{value}'"))?
        }
        other => bail!("unknown config key '{other}'"),
    }
    Ok(())
}

fn render(cfg: &RecipesConfig, home: &Path) -> String {
    let token = if cfg.gateway.token.is_some() {
        "(set)"
    } else {
        "(none)"
    };
    format!(
        "config:               {}\n\
         workspace_root:       {}\n\
         cron_installation:    {}\n\
         scheduler:            {}\n\
         gateway.url:          {}\n\
         gateway.token:        {token}\n\
         gateway.timeout_secs: {}\n\
         local_jobs_path:      {}\n",
        config::config_path_at(home).display(),
        cfg.workspace_root_at(home).display(),
        cfg.cron_installation,
        cfg.scheduler,
        cfg.gateway.url,
        cfg.gateway.timeout_secs,
        cfg.local_jobs_path_at(home).display(),
    )
}
