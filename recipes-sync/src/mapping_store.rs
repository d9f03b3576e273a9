//! Mapping store — per-owner record of installed scheduler jobs.
//!
//! Persists a [`MappingState`] JSON document (`{ "version": 1, "entries": {…} }`),
//! usually at `<owner>/notes/cron-jobs.json`.
//! Writes use the atomic `.tmp` + rename pattern.

use std::io::ErrorKind;
use std::path::Path;

use recipes_core::{MappingState, MAPPING_VERSION};

use crate::error::{io_err, SyncError};

/// Load the mapping state at `path`.
///
/// Never fails: a missing, unreadable, malformed, or differently-versioned
/// file is a cold start and yields an empty state.
pub fn load(path: &Path) -> MappingState {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("ignoring unreadable mapping store {}: {e}", path.display());
            }
            return MappingState::default();
        }
    };

    match serde_json::from_str::<MappingState>(&contents) {
        Ok(state) if state.version == MAPPING_VERSION => state,
        Ok(state) => {
            tracing::warn!(
                "mapping store {} has version {}; starting fresh",
                path.display(),
                state.version
            );
            MappingState::default()
        }
        Err(e) => {
            tracing::warn!("ignoring malformed mapping store {}: {e}", path.display());
            MappingState::default()
        }
    }
}

/// Save `state` to `path` atomically, replacing any prior content.
///
/// Writes to `<path>.tmp` then renames to `<path>`. Output is deterministic
/// for equal states.
pub fn save(path: &Path, state: &MappingState) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid mapping store path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let mut json = serde_json::to_string_pretty(state)?;
    json.push('\n');
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("saved mapping store: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipes_core::MappingEntry;
    use tempfile::TempDir;

    fn entry(id: &str) -> MappingEntry {
        MappingEntry {
            installed_job_id: id.to_string(),
            spec_hash: "deadbeef".to_string(),
            orphaned: false,
            updated_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn empty_state_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let state = load(&tmp.path().join("notes").join("cron-jobs.json"));
        assert_eq!(state, MappingState::default());
        assert_eq!(state.version, MAPPING_VERSION);
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes").join("cron-jobs.json");
        let mut state = MappingState::default();
        state
            .entries
            .insert("team:t:r:daily".to_string(), entry("ext-1"));

        save(&path, &state).unwrap();
        assert_eq!(load(&path), state);
    }

    #[test]
    fn persisted_keys_are_camel_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cron-jobs.json");
        let mut state = MappingState::default();
        state.entries.insert("agent:a:r:j".to_string(), entry("ext-9"));
        save(&path, &state).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"installedJobId\": \"ext-9\""));
        assert!(raw.contains("\"specHash\""));
        assert!(raw.contains("\"updatedAtMs\""));
    }

    #[test]
    fn other_versions_are_a_cold_start() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cron-jobs.json");
        std::fs::write(
            &path,
            r#"{"version":2,"entries":{"team:t:r:j":{"installedJobId":"x","specHash":"h","orphaned":false,"updatedAtMs":1}}}"#,
        )
        .unwrap();
        assert!(load(&path).entries.is_empty());
    }

    #[test]
    fn malformed_json_is_a_cold_start() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cron-jobs.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load(&path), MappingState::default());

        std::fs::write(&path, r#"{"version":1,"entries":[]}"#).unwrap();
        assert_eq!(load(&path), MappingState::default());
    }

    #[test]
    fn save_is_deterministic_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cron-jobs.json");
        let mut state = MappingState::default();
        state.entries.insert("team:t:r:b".to_string(), entry("2"));
        state.entries.insert("team:t:r:a".to_string(), entry("1"));

        save(&path, &state).unwrap();
        let first = std::fs::read(&path).unwrap();
        save(&path, &load(&path)).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
