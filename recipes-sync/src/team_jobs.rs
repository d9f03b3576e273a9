//! Team ownership stamps on scheduler jobs.
//!
//! Every job installed for a team carries `recipes.teamId=<id>` on the last
//! line of its message. Tearing a team down later can then find its jobs in
//! the scheduler without the mapping store: a stamped job is an exact match,
//! a job that merely mentions the team id is listed for manual review.

use serde::Serialize;
use serde_json::Value;

use recipes_core::{ExternalJob, Owner, OwnerKind};

use crate::error::SchedulerError;
use crate::scheduler::SchedulerClient;

/// Teams that removal must never touch.
const PROTECTED_TEAMS: &[&str] = &["development-team", "main"];

/// `recipes.teamId=<id>`
pub fn team_stamp(team_id: &str) -> String {
    format!("recipes.teamId={team_id}")
}

/// The message sent to the scheduler: team-owned jobs get the stamp
/// appended on its own line, agent-owned jobs are sent as declared.
pub fn stamped_message(owner: &Owner, message: &str) -> String {
    match owner.kind {
        OwnerKind::Team => format!("{message}\n[recipes] {}", team_stamp(&owner.id)),
        OwnerKind::Agent => message.to_string(),
    }
}

pub fn is_protected_team(team_id: &str) -> bool {
    PROTECTED_TEAMS.contains(&team_id)
}

/// One scheduler job selected by [`plan_removals`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedJob {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Scheduler jobs belonging to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalPlan {
    pub team_id: String,
    pub protected: bool,
    /// Jobs whose message carries the team stamp.
    pub exact: Vec<PlannedJob>,
    /// Unstamped jobs whose name or message mentions the team id.
    pub ambiguous: Vec<PlannedJob>,
}

pub fn plan_removals(jobs: &[ExternalJob], team_id: &str) -> RemovalPlan {
    let stamp = team_stamp(team_id);
    let mut exact = Vec::new();
    let mut ambiguous = Vec::new();

    for job in jobs {
        let message = payload_message(job);
        let name = job.name.as_deref().unwrap_or_default();
        if message.contains(&stamp) {
            exact.push(PlannedJob {
                id: job.id.clone(),
                name: job.name.clone(),
                reason: None,
            });
        } else if name.contains(team_id) || message.contains(team_id) {
            ambiguous.push(PlannedJob {
                id: job.id.clone(),
                name: job.name.clone(),
                reason: Some("mentions-teamId"),
            });
        }
    }

    RemovalPlan {
        team_id: team_id.to_string(),
        protected: is_protected_team(team_id),
        exact,
        ambiguous,
    }
}

/// Lists every job, disabled ones included, and plans the team's removal.
pub fn plan_team_removal(
    client: &dyn SchedulerClient,
    team_id: &str,
) -> Result<RemovalPlan, SchedulerError> {
    let jobs = client.list(true)?;
    let plan = plan_removals(&jobs, team_id);
    tracing::info!(
        "team '{team_id}': {} stamped job(s), {} for review",
        plan.exact.len(),
        plan.ambiguous.len()
    );
    Ok(plan)
}

/// `payload.message` for agent turns, `payload.text` for system events.
fn payload_message(job: &ExternalJob) -> &str {
    let Some(payload) = &job.payload else {
        return "";
    };
    payload
        .get("message")
        .or_else(|| payload.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}
