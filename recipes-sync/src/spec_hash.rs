//! Content hashing for drift detection.
//!
//! A [`DesiredSpec`] holds every scheduler-relevant field of a declared job
//! with absent optionals replaced by empty strings. Its hash is SHA-256 over
//! the compact JSON of that fixed struct, so it depends on content only.

use serde::Serialize;
use sha2::{Digest, Sha256};

use recipes_core::{DeclaredJob, Owner, RecipeId};

use crate::team_jobs::stamped_message;

/// Canonical, hashable form of a declared job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredSpec {
    pub schedule: String,
    /// As sent to the scheduler, team stamp included.
    pub message: String,
    pub timezone: String,
    /// Empty when absent; the scheduler then gets no delivery block.
    pub channel: String,
    pub to: String,
    pub agent_id: String,
    pub name: String,
    pub description: String,
}

impl DesiredSpec {
    pub fn new(owner: &Owner, recipe_id: &RecipeId, job: &DeclaredJob) -> Self {
        Self {
            schedule: job.schedule.clone(),
            message: stamped_message(owner, &job.message),
            timezone: job.timezone.clone().unwrap_or_default(),
            channel: job.channel.clone().unwrap_or_default(),
            to: job.to.clone().unwrap_or_default(),
            agent_id: job.agent_id.clone().unwrap_or_default(),
            name: display_name(owner, recipe_id, job),
            description: job.description.clone().unwrap_or_default(),
        }
    }

    /// SHA-256 hex digest of the compact JSON serialization.
    pub fn hash(&self) -> String {
        // A struct of plain strings always serializes.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// The job's `name`, or `<ownerId> • <recipeId> • <jobId>`.
pub fn display_name(owner: &Owner, recipe_id: &RecipeId, job: &DeclaredJob) -> String {
    job.name
        .clone()
        .unwrap_or_else(|| format!("{} • {} • {}", owner.id, recipe_id, job.id))
}
