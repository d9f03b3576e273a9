//! Reconciler — converges a recipe's declared cron jobs onto the scheduler.
//!
//! ## Pass outline
//!
//! 1. No declared jobs → return `no-jobs`.
//! 2. Policy gate → `mode-off` / `declined` return before any scheduler call.
//! 3. Load the mapping store.
//! 4. Call `list` only if some declared job already has a mapping entry.
//! 5. Per declared job, in recipe order: create, update, or leave as is;
//!    then force-disable if not opted in and the job is enabled.
//! 6. Orphan sweep: disable jobs whose declared id disappeared, keep their entries.
//! 7. Save the mapping store once.
//!
//! Any scheduler failure aborts the pass before step 7.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use recipes_core::{
    DeclaredJob, ExternalJob, InstallMode, MappingEntry, MappingKey, MappingState, Owner,
    RecipeId,
};

use crate::error::{SchedulerError, SyncError};
use crate::mapping_store;
use crate::policy::{self, NonInteractive, PolicyDecision, Prompter, SkipReason};
use crate::scheduler::{JobPatch, JobSpec, SchedulerClient};
use crate::spec_hash::DesiredSpec;

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// Everything one reconciliation pass needs besides its collaborators.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileRequest<'a> {
    pub owner: &'a Owner,
    pub recipe_id: &'a RecipeId,
    /// Already normalized, in recipe order.
    pub jobs: &'a [DeclaredJob],
    pub mode: InstallMode,
    pub store_path: &'a Path,
    /// Compute outcomes without `create`/`update` calls, prompts, or a store write.
    pub dry_run: bool,
}

/// What happened to one declared job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobAction {
    Created,
    Updated,
    Unchanged,
    /// Forced off because the operator did not opt in. Takes precedence over
    /// `updated`; see [`JobOutcome::content_updated`].
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub job_id: String,
    pub key: String,
    pub action: JobAction,
    /// `None` only for a dry-run create.
    pub installed_job_id: Option<String>,
    /// Enabled state after the pass, as far as this pass knows it.
    pub enabled: bool,
    pub content_updated: bool,
}

/// An orphaned entry whose job the sweep switched off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedOutcome {
    pub job_id: String,
    pub key: String,
    pub action: &'static str,
    pub installed_job_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub disabled: usize,
    pub disabled_removed: usize,
}

/// Machine-readable result of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    pub opted_in: bool,
    pub dry_run: bool,
    pub counts: ActionCounts,
    pub jobs: Vec<JobOutcome>,
    pub removed: Vec<RemovedOutcome>,
}

impl ReconcileSummary {
    fn skipped(reason: SkipReason, dry_run: bool) -> Self {
        Self {
            changed: false,
            reason: Some(reason),
            opted_in: false,
            dry_run,
            counts: ActionCounts::default(),
            jobs: Vec::new(),
            removed: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Run one reconciliation pass for `(req.owner, req.recipe_id)`.
///
/// Assumes no other pass for the same owner runs concurrently.
pub fn reconcile(
    req: &ReconcileRequest<'_>,
    client: &dyn SchedulerClient,
    prompter: &dyn Prompter,
) -> Result<ReconcileSummary, SyncError> {
    if req.jobs.is_empty() {
        return Ok(ReconcileSummary::skipped(SkipReason::NoJobs, req.dry_run));
    }

    // Dry runs never block on a human.
    let prompter: &dyn Prompter = if req.dry_run {
        &NonInteractive
    } else {
        prompter
    };
    let opted_in = match policy::evaluate(req.mode, req.recipe_id, req.jobs.len(), prompter)? {
        PolicyDecision::Proceed { opted_in } => opted_in,
        PolicyDecision::Skip(reason) => {
            tracing::info!("skipping cron reconciliation for '{}': {reason:?}", req.recipe_id);
            return Ok(ReconcileSummary::skipped(reason, req.dry_run));
        }
    };

    let mut pass = Pass {
        req,
        client,
        opted_in,
        now_ms: Utc::now().timestamp_millis(),
        state: mapping_store::load(req.store_path),
        external: HashMap::new(),
    };

    let keys: Vec<MappingKey> = req
        .jobs
        .iter()
        .map(|job| MappingKey::new(req.owner, req.recipe_id, &job.id))
        .collect();
    if keys.iter().any(|key| pass.state.get(key).is_some()) {
        pass.external = client
            .list(true)
            .map_err(SyncError::List)?
            .into_iter()
            .map(|job| (job.id.clone(), job))
            .collect();
    } else {
        tracing::debug!("no prior mappings for '{}'; skipping list", req.recipe_id);
    }

    let mut jobs = Vec::with_capacity(req.jobs.len());
    for (job, key) in req.jobs.iter().zip(&keys) {
        let outcome = pass.apply(job, key).map_err(|source| SyncError::Job {
            job_id: job.id.clone(),
            source,
        })?;
        jobs.push(outcome);
    }

    let removed = pass.sweep_orphans()?;

    if !req.dry_run {
        mapping_store::save(req.store_path, &pass.state)?;
    }

    let counts = count(&jobs, &removed);
    let changed = counts.created + counts.updated + counts.disabled + counts.disabled_removed > 0;
    Ok(ReconcileSummary {
        changed,
        reason: None,
        opted_in: pass.opted_in,
        dry_run: req.dry_run,
        counts,
        jobs,
        removed,
    })
}

// ---------------------------------------------------------------------------
// Per-pass state
// ---------------------------------------------------------------------------

struct Pass<'r, 'a> {
    req: &'r ReconcileRequest<'a>,
    client: &'r dyn SchedulerClient,
    opted_in: bool,
    now_ms: i64,
    state: MappingState,
    external: HashMap<String, ExternalJob>,
}

impl Pass<'_, '_> {
    fn apply(&mut self, job: &DeclaredJob, key: &MappingKey) -> Result<JobOutcome, SchedulerError> {
        let req = self.req;
        let spec_hash = DesiredSpec::new(req.owner, req.recipe_id, job).hash();
        let want_enabled = self.opted_in && job.enabled_by_default;
        let spec = JobSpec::build(req.owner, req.recipe_id, job, want_enabled);
        let encoded = key.encode();

        let mapped = self.state.entries.get(&encoded).and_then(|entry| {
            self.external
                .get(&entry.installed_job_id)
                .map(|existing| (entry.clone(), existing.clone()))
        });

        let Some((entry, existing)) = mapped else {
            let installed = if req.dry_run {
                None
            } else {
                Some(self.client.create(&spec)?)
            };
            tracing::info!(
                "created cron job '{}' ({}) enabled={want_enabled}",
                job.id,
                installed.as_deref().unwrap_or("dry-run")
            );
            if let Some(id) = &installed {
                self.state.entries.insert(
                    encoded.clone(),
                    MappingEntry {
                        installed_job_id: id.clone(),
                        spec_hash,
                        orphaned: false,
                        updated_at_ms: self.now_ms,
                    },
                );
            }
            return Ok(JobOutcome {
                job_id: job.id.clone(),
                key: encoded,
                action: JobAction::Created,
                installed_job_id: installed,
                enabled: want_enabled,
                content_updated: true,
            });
        };

        let content_updated = entry.spec_hash != spec_hash;
        if content_updated {
            if !req.dry_run {
                self.client.update(&existing.id, &JobPatch::content(&spec))?;
            }
            tracing::info!("updated cron job '{}' ({})", job.id, existing.id);
        } else {
            tracing::debug!("unchanged cron job '{}' ({})", job.id, existing.id);
        }

        let disabled = !self.opted_in && existing.enabled;
        if disabled {
            if !req.dry_run {
                self.client.update(&existing.id, &JobPatch::disable())?;
            }
            tracing::info!("disabled cron job '{}' ({}): not opted in", job.id, existing.id);
        }

        // Untouched entries keep their timestamp so idempotent passes rewrite identical bytes.
        if content_updated || disabled || entry.orphaned {
            self.state.entries.insert(
                encoded.clone(),
                MappingEntry {
                    installed_job_id: existing.id.clone(),
                    spec_hash,
                    orphaned: false,
                    updated_at_ms: self.now_ms,
                },
            );
        }

        let action = if disabled {
            JobAction::Disabled
        } else if content_updated {
            JobAction::Updated
        } else {
            JobAction::Unchanged
        };
        Ok(JobOutcome {
            job_id: job.id.clone(),
            key: encoded,
            action,
            installed_job_id: Some(existing.id.clone()),
            enabled: existing.enabled && !disabled,
            content_updated,
        })
    }

    fn sweep_orphans(&mut self) -> Result<Vec<RemovedOutcome>, SyncError> {
        let req = self.req;
        let declared: HashSet<&str> = req.jobs.iter().map(|job| job.id.as_str()).collect();
        let orphans: Vec<(MappingKey, MappingEntry)> = self
            .state
            .scoped(req.owner, req.recipe_id)
            .filter(|(key, _)| !declared.contains(key.job_id.as_str()))
            .map(|(key, entry)| (key, entry.clone()))
            .collect();

        let mut removed = Vec::new();
        for (key, entry) in orphans {
            let encoded = key.encode();
            let enabled = self
                .external
                .get(&entry.installed_job_id)
                .is_some_and(|job| job.enabled);

            if enabled {
                if !req.dry_run {
                    self.client
                        .update(&entry.installed_job_id, &JobPatch::disable())
                        .map_err(|source| SyncError::Orphan {
                            key: encoded.clone(),
                            source,
                        })?;
                }
                tracing::info!(
                    "disabled orphaned cron job '{}' ({})",
                    key.job_id,
                    entry.installed_job_id
                );
                removed.push(RemovedOutcome {
                    job_id: key.job_id.clone(),
                    key: encoded.clone(),
                    action: "disabled-removed",
                    installed_job_id: entry.installed_job_id.clone(),
                });
            }

            if enabled || !entry.orphaned {
                self.state.entries.insert(
                    encoded,
                    MappingEntry {
                        orphaned: true,
                        updated_at_ms: self.now_ms,
                        ..entry
                    },
                );
            }
        }
        Ok(removed)
    }
}

fn count(jobs: &[JobOutcome], removed: &[RemovedOutcome]) -> ActionCounts {
    let mut counts = ActionCounts {
        disabled_removed: removed.len(),
        ..ActionCounts::default()
    };
    for outcome in jobs {
        match outcome.action {
            JobAction::Created => counts.created += 1,
            JobAction::Updated => counts.updated += 1,
            JobAction::Unchanged => counts.unchanged += 1,
            JobAction::Disabled => counts.disabled += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::policy::FixedAnswer;
    use tempfile::TempDir;

    /// Answers `list` from a fixed set and fails every other call.
    struct ListOnly(Vec<ExternalJob>, RefCell<usize>);

    impl SchedulerClient for ListOnly {
        fn list(&self, _include_disabled: bool) -> Result<Vec<ExternalJob>, SchedulerError> {
            *self.1.borrow_mut() += 1;
            Ok(self.0.clone())
        }

        fn create(&self, _job: &JobSpec) -> Result<String, SchedulerError> {
            Err(SchedulerError::Unavailable("create not expected".into()))
        }

        fn update(&self, _job_id: &str, _patch: &JobPatch) -> Result<(), SchedulerError> {
            Err(SchedulerError::Unavailable("update not expected".into()))
        }
    }

    fn job(id: &str) -> DeclaredJob {
        DeclaredJob {
            id: id.to_string(),
            schedule: "0 9 * * *".into(),
            message: "send report".into(),
            name: None,
            description: None,
            timezone: None,
            channel: None,
            to: None,
            agent_id: None,
            enabled_by_default: true,
        }
    }

    #[test]
    fn empty_job_list_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cron-jobs.json");
        let owner = Owner::team("t");
        let recipe = RecipeId::from("r");
        let client = ListOnly(Vec::new(), RefCell::new(0));
        let req = ReconcileRequest {
            owner: &owner,
            recipe_id: &recipe,
            jobs: &[],
            mode: InstallMode::On,
            store_path: &path,
            dry_run: false,
        };
        let summary = reconcile(&req, &client, &NonInteractive).unwrap();
        assert_eq!(summary.reason, Some(SkipReason::NoJobs));
        assert!(!summary.changed);
        assert_eq!(*client.1.borrow(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn dry_run_reports_creates_without_calls_or_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cron-jobs.json");
        let owner = Owner::team("t");
        let recipe = RecipeId::from("r");
        let jobs = [job("daily-report")];
        let client = ListOnly(Vec::new(), RefCell::new(0));
        let req = ReconcileRequest {
            owner: &owner,
            recipe_id: &recipe,
            jobs: &jobs,
            mode: InstallMode::Prompt,
            store_path: &path,
            dry_run: true,
        };
        // An interactive "no" would skip; dry runs never ask.
        let summary = reconcile(&req, &client, &FixedAnswer(false)).unwrap();
        assert!(summary.changed && summary.dry_run);
        assert_eq!(summary.jobs[0].action, JobAction::Created);
        assert_eq!(summary.jobs[0].installed_job_id, None);
        assert!(!summary.jobs[0].enabled);
        assert!(!path.exists());
    }

    #[test]
    fn summary_serializes_kebab_case_actions() {
        let summary = ReconcileSummary::skipped(SkipReason::ModeOff, false);
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["reason"], "mode-off");
        assert_eq!(value["counts"]["disabledRemoved"], 0);

        let outcome = JobOutcome {
            job_id: "j".into(),
            key: "team:t:r:j".into(),
            action: JobAction::Disabled,
            installed_job_id: Some("x".into()),
            enabled: false,
            content_updated: false,
        };
        assert_eq!(serde_json::to_value(outcome).unwrap()["action"], "disabled");
    }
}
