//! Operator configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.recipes/
//!   config.yaml   (mode 0600, every field optional)
//! ```
//!
//! # API pattern
//!
//! Every function takes the home directory explicitly (`fn_at(home: &Path, …)`).
//! The CLI resolves it once with `dirs::home_dir()`; tests pass a `TempDir`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{InstallMode, Owner, OwnerKind};

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:18789";
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;

/// Mapping file name inside an owner's notes directory.
pub const MAPPING_FILE: &str = "cron-jobs.json";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which transport reaches the external scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// `POST <gateway>/tools/invoke` with the `cron` tool.
    #[default]
    Gateway,
    /// The scheduler's `jobs.json` file, edited in place.
    Local,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Gateway => write!(f, "gateway"),
            SchedulerKind::Local => write!(f, "local"),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(Self::Gateway),
            "local" => Ok(Self::Local),
            other => Err(format!(
                "unknown scheduler '{other}'; expected: gateway, local"
            )),
        }
    }
}

/// Gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            token: None,
            timeout_secs: DEFAULT_GATEWAY_TIMEOUT_SECS,
        }
    }
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_gateway_timeout() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_SECS
}

/// Contents of `~/.recipes/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecipesConfig {
    /// Defaults to `<home>/.openclaw/workspace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    #[serde(default)]
    pub cron_installation: InstallMode,
    #[serde(default)]
    pub scheduler: SchedulerKind,
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Defaults to `<home>/.openclaw/cron/jobs.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_jobs_path: Option<PathBuf>,
}

impl RecipesConfig {
    pub fn workspace_root_at(&self, home: &Path) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| home.join(".openclaw").join("workspace"))
    }

    pub fn local_jobs_path_at(&self, home: &Path) -> PathBuf {
        self.local_jobs_path
            .clone()
            .unwrap_or_else(|| home.join(".openclaw").join("cron").join("jobs.json"))
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.recipes/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".recipes").join("config.yaml")
}

/// Where the mapping file of `owner` lives — pure, no I/O.
///
/// Teams live in a sibling `workspace-<teamId>` directory; agents under
/// `<workspace_root>/agents/<agentId>`.
pub fn mapping_path(workspace_root: &Path, owner: &Owner) -> PathBuf {
    let owner_dir = match owner.kind {
        OwnerKind::Team => {
            let parent = workspace_root.parent().unwrap_or(workspace_root);
            parent.join(format!("workspace-{}", owner.id))
        }
        OwnerKind::Agent => workspace_root.join("agents").join(&owner.id),
    };
    owner_dir.join("notes").join(MAPPING_FILE)
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load config from `<home>/.recipes/config.yaml`; defaults when absent.
pub fn load_at(home: &Path) -> Result<RecipesConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(RecipesConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(RecipesConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// Atomically save config: serialize → `.yaml.tmp` → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &RecipesConfig) -> Result<(), ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
