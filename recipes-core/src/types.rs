//! Domain types for recipe cron synchronization.
//!
//! Persisted types serialize with camelCase keys so the mapping file stays
//! readable next to the scheduler's own JSON documents.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Only mapping documents with this version are loaded; anything else is a cold start.
pub const MAPPING_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed recipe identifier (front matter `id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipeId(pub String);

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecipeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecipeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Owners
// ---------------------------------------------------------------------------

/// Which kind of workspace owns a set of installed jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Team,
    Agent,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKind::Team => write!(f, "team"),
            OwnerKind::Agent => write!(f, "agent"),
        }
    }
}

/// The team or agent a recipe was scaffolded into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: String,
}

impl Owner {
    pub fn team(id: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Team,
            id: id.into(),
        }
    }

    pub fn agent(id: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Agent,
            id: id.into(),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ---------------------------------------------------------------------------
// Declared jobs
// ---------------------------------------------------------------------------

/// A scheduled job as declared by a recipe, after normalization.
///
/// `id` is recipe-local and never the scheduler's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredJob {
    pub id: String,
    pub schedule: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub enabled_by_default: bool,
}

// ---------------------------------------------------------------------------
// Mapping keys
// ---------------------------------------------------------------------------

/// Composite identity of one declared job within one owner and recipe.
///
/// Encoded as `kind:owner:recipe:job` with `%` and `:` percent-escaped in
/// every component, so distinct tuples never share a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingKey {
    pub owner: Owner,
    pub recipe_id: RecipeId,
    pub job_id: String,
}

impl MappingKey {
    pub fn new(owner: &Owner, recipe_id: &RecipeId, job_id: &str) -> Self {
        Self {
            owner: owner.clone(),
            recipe_id: recipe_id.clone(),
            job_id: job_id.to_owned(),
        }
    }

    /// Stable storage string for this key.
    pub fn encode(&self) -> String {
        format!(
            "{}{}",
            Self::scope_prefix(&self.owner, &self.recipe_id),
            escape(&self.job_id)
        )
    }

    /// Prefix shared by every key of `(owner, recipe_id)`.
    pub fn scope_prefix(owner: &Owner, recipe_id: &RecipeId) -> String {
        format!(
            "{}:{}:{}:",
            owner.kind,
            escape(&owner.id),
            escape(&recipe_id.0)
        )
    }

    /// Inverse of [`MappingKey::encode`]. Returns `None` for foreign strings.
    pub fn decode(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        let kind = match parts.next()? {
            "team" => OwnerKind::Team,
            "agent" => OwnerKind::Agent,
            _ => return None,
        };
        let owner_id = unescape(parts.next()?)?;
        let recipe_id = unescape(parts.next()?)?;
        let job_id = unescape(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            owner: Owner { kind, id: owner_id },
            recipe_id: RecipeId(recipe_id),
            job_id,
        })
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn escape(component: &str) -> String {
    component.replace('%', "%25").replace(':', "%3A")
}

fn unescape(component: &str) -> Option<String> {
    let mut out = String::with_capacity(component.len());
    let mut rest = component;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = rest.get(pos + 1..pos + 3)?;
        match code {
            "25" => out.push('%'),
            "3A" => out.push(':'),
            _ => return None,
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Some(out)
}

// ---------------------------------------------------------------------------
// Mapping state
// ---------------------------------------------------------------------------

/// Local record of the external job a declared job was installed as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub installed_job_id: String,
    pub spec_hash: String,
    #[serde(default)]
    pub orphaned: bool,
    pub updated_at_ms: i64,
}

impl MappingEntry {
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.updated_at_ms)
    }
}

/// Root of the persisted mapping document.
///
/// `BTreeMap` keeps serialization order stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingState {
    pub version: u32,
    #[serde(default)]
    pub entries: BTreeMap<String, MappingEntry>,
}

impl Default for MappingState {
    fn default() -> Self {
        Self {
            version: MAPPING_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl MappingState {
    pub fn get(&self, key: &MappingKey) -> Option<&MappingEntry> {
        self.entries.get(&key.encode())
    }

    /// Entries belonging to `(owner, recipe_id)`, with their decoded keys.
    pub fn scoped<'a>(
        &'a self,
        owner: &Owner,
        recipe_id: &RecipeId,
    ) -> impl Iterator<Item = (MappingKey, &'a MappingEntry)> + 'a {
        let prefix = MappingKey::scope_prefix(owner, recipe_id);
        self.entries.iter().filter_map(move |(raw, entry)| {
            if !raw.starts_with(&prefix) {
                return None;
            }
            MappingKey::decode(raw).map(|key| (key, entry))
        })
    }
}

// ---------------------------------------------------------------------------
// Scheduler view
// ---------------------------------------------------------------------------

/// A job as reported by the external scheduler. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalJob {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Install policy
// ---------------------------------------------------------------------------

/// Operator setting controlling whether recipe cron jobs are installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    Off,
    #[default]
    Prompt,
    On,
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallMode::Off => write!(f, "off"),
            InstallMode::Prompt => write!(f, "prompt"),
            InstallMode::On => write!(f, "on"),
        }
    }
}

impl FromStr for InstallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "prompt" => Ok(Self::Prompt),
            "on" => Ok(Self::On),
            other => Err(format!(
                "unknown cron installation mode '{other}'; expected: off, prompt, on"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key(owner: Owner, recipe: &str, job: &str) -> MappingKey {
        MappingKey::new(&owner, &RecipeId::from(recipe), job)
    }

    #[test]
    fn key_encoding_is_readable() {
        let k = key(Owner::team("dev-team"), "development-team", "daily-standup");
        assert_eq!(k.encode(), "team:dev-team:development-team:daily-standup");
    }

    #[test]
    fn keys_with_colons_do_not_collide() {
        let a = key(Owner::team("a:b"), "c", "j");
        let b = key(Owner::team("a"), "b:c", "j");
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn same_job_id_differs_across_owner_kinds() {
        let a = key(Owner::team("x"), "r", "j");
        let b = key(Owner::agent("x"), "r", "j");
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn decode_inverts_encode() {
        let k = key(Owner::agent("100%:agent"), "re:cipe", "job%3A");
        assert_eq!(MappingKey::decode(&k.encode()), Some(k));
    }

    #[test]
    fn decode_rejects_foreign_strings() {
        assert_eq!(MappingKey::decode("project:a:b:c"), None);
        assert_eq!(MappingKey::decode("team:a:b"), None);
        assert_eq!(MappingKey::decode("team:a:b:c:d"), None);
        assert_eq!(MappingKey::decode("team:a%zz:b:c"), None);
    }

    #[test]
    fn scoped_filters_by_owner_and_recipe() {
        let mut state = MappingState::default();
        let entry = MappingEntry {
            installed_job_id: "ext-1".into(),
            spec_hash: "h".into(),
            orphaned: false,
            updated_at_ms: 0,
        };
        for k in [
            key(Owner::team("t"), "r", "one"),
            key(Owner::team("t"), "r2", "two"),
            key(Owner::team("t2"), "r", "three"),
        ] {
            state.entries.insert(k.encode(), entry.clone());
        }

        let ids: Vec<String> = state
            .scoped(&Owner::team("t"), &RecipeId::from("r"))
            .map(|(k, _)| k.job_id)
            .collect();
        assert_eq!(ids, vec!["one".to_string()]);
    }

    #[test]
    fn external_job_enabled_defaults_to_false() {
        let job: ExternalJob = serde_json::from_str(r#"{"id":"abc"}"#).expect("parse");
        assert!(!job.enabled);
    }

    #[test]
    fn install_mode_display_roundtrips() {
        for mode in [InstallMode::Off, InstallMode::Prompt, InstallMode::On] {
            assert_eq!(mode.to_string().parse::<InstallMode>(), Ok(mode));
        }
    }
}
