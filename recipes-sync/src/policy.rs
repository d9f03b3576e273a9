//! Policy gate — resolves the operator's install mode into an opt-in decision.
//!
//! Under `prompt`, a missing terminal still runs the pass with every job left
//! disabled; an interactive "no" skips the pass.

use serde::Serialize;

use recipes_core::{InstallMode, RecipeId};

use crate::error::SyncError;

/// Source of yes/no answers for `prompt` mode.
pub trait Prompter {
    /// Whether a human can answer right now.
    fn is_interactive(&self) -> bool;

    /// Ask `question`; only called when [`Prompter::is_interactive`] is true.
    fn confirm(&self, question: &str) -> Result<bool, String>;
}

/// A prompter for headless runs: never interactive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn is_interactive(&self) -> bool {
        false
    }

    fn confirm(&self, _question: &str) -> Result<bool, String> {
        Ok(false)
    }
}

/// An interactive prompter that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompter for FixedAnswer {
    fn is_interactive(&self) -> bool {
        true
    }

    fn confirm(&self, _question: &str) -> Result<bool, String> {
        Ok(self.0)
    }
}

/// Why a pass returned without touching the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    NoJobs,
    ModeOff,
    Declined,
}

/// Outcome of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Run the pass; jobs may only be enabled when `opted_in`.
    Proceed { opted_in: bool },
    /// Return without touching the scheduler or the mapping store.
    Skip(SkipReason),
}

/// Resolve `mode` for `job_count` declared jobs of `recipe_id`.
pub fn evaluate(
    mode: InstallMode,
    recipe_id: &RecipeId,
    job_count: usize,
    prompter: &dyn Prompter,
) -> Result<PolicyDecision, SyncError> {
    match mode {
        InstallMode::Off => Ok(PolicyDecision::Skip(SkipReason::ModeOff)),
        InstallMode::On => Ok(PolicyDecision::Proceed { opted_in: true }),
        InstallMode::Prompt => {
            if !prompter.is_interactive() {
                tracing::info!(
                    "no terminal to confirm cron jobs for '{recipe_id}'; installing them disabled"
                );
                return Ok(PolicyDecision::Proceed { opted_in: false });
            }
            let question = format!(
                "Install {job_count} cron job(s) from recipe '{recipe_id}'? They stay disabled unless you answer yes."
            );
            if prompter.confirm(&question).map_err(SyncError::Prompt)? {
                Ok(PolicyDecision::Proceed { opted_in: true })
            } else {
                Ok(PolicyDecision::Skip(SkipReason::Declined))
            }
        }
    }
}
