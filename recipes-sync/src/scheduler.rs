//! Scheduler client — the narrow `list` / `create` / `update` seam.
//!
//! The scheduler is reached through a single tool-call primitive
//! ([`ToolInvoker`]): `{ action, ...args }` in, text blocks out. The text is
//! parsed as JSON here; transports live at the edge (see `recipes-cli`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use recipes_core::{DeclaredJob, ExternalJob, Owner, RecipeId};

use crate::error::{MalformedReply, SchedulerError};
use crate::spec_hash::display_name;
use crate::team_jobs::stamped_message;

/// Name of the scheduler tool on the host.
pub const CRON_TOOL: &str = "cron";

const WAKE_MODE: &str = "next-heartbeat";
const DELIVERY_MODE: &str = "announce";

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    pub kind: String,
    pub expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
}

/// What the scheduler runs: an agent turn when an executor is named,
/// otherwise a system event for the owner's main session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Payload {
    AgentTurn { message: String },
    SystemEvent { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub best_effort: bool,
}

/// Full job definition sent with `add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub name: String,
    pub agent_id: Option<String>,
    pub description: String,
    pub enabled: bool,
    pub wake_mode: String,
    pub session_target: String,
    pub schedule: CronSchedule,
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
}

impl JobSpec {
    pub fn build(owner: &Owner, recipe_id: &RecipeId, job: &DeclaredJob, enabled: bool) -> Self {
        let message = stamped_message(owner, &job.message);
        let (session_target, payload) = match &job.agent_id {
            Some(_) => ("isolated", Payload::AgentTurn { message }),
            None => ("main", Payload::SystemEvent { text: message }),
        };
        let delivery = (job.channel.is_some() || job.to.is_some()).then(|| Delivery {
            mode: DELIVERY_MODE.to_string(),
            channel: job.channel.clone(),
            to: job.to.clone(),
            best_effort: true,
        });

        Self {
            name: display_name(owner, recipe_id, job),
            agent_id: job.agent_id.clone(),
            description: job.description.clone().unwrap_or_default(),
            enabled,
            wake_mode: WAKE_MODE.to_string(),
            session_target: session_target.to_string(),
            schedule: CronSchedule {
                kind: "cron".to_string(),
                expr: job.schedule.clone(),
                tz: job.timezone.clone(),
            },
            payload,
            delivery,
        }
    }
}

/// Partial update sent with `update`. Absent fields are left unchanged
/// server-side; `Some(None)` clears a field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<CronSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Option<Delivery>>,
}

impl JobPatch {
    /// Every content field of `spec`; never touches `enabled`.
    pub fn content(spec: &JobSpec) -> Self {
        Self {
            name: Some(spec.name.clone()),
            agent_id: Some(spec.agent_id.clone()),
            description: Some(spec.description.clone()),
            enabled: None,
            wake_mode: Some(spec.wake_mode.clone()),
            session_target: Some(spec.session_target.clone()),
            schedule: Some(spec.schedule.clone()),
            payload: Some(spec.payload.clone()),
            delivery: Some(spec.delivery.clone()),
        }
    }

    pub fn disable() -> Self {
        Self {
            enabled: Some(false),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Client seam
// ---------------------------------------------------------------------------

/// The three scheduler operations reconciliation depends on.
pub trait SchedulerClient {
    /// Every job the scheduler knows about.
    fn list(&self, include_disabled: bool) -> Result<Vec<ExternalJob>, SchedulerError>;

    /// Create a job and return its scheduler id.
    fn create(&self, job: &JobSpec) -> Result<String, SchedulerError>;

    /// Apply a partial update to an existing job.
    fn update(&self, job_id: &str, patch: &JobPatch) -> Result<(), SchedulerError>;
}

// ---------------------------------------------------------------------------
// Tool-call boundary
// ---------------------------------------------------------------------------

/// Error type returned by transports.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A tool-call result: zero or more content blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(default)]
    pub content: Vec<ToolContent>,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: Some(text.into()),
            }],
        }
    }

    /// The first `text` block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|c| c.kind == "text")
            .and_then(|c| c.text.as_deref())
    }
}

/// Opaque request/response primitive the host exposes for tool calls.
pub trait ToolInvoker {
    fn invoke(&self, tool: &str, args: &Value) -> Result<ToolResponse, TransportError>;
}

/// [`SchedulerClient`] over any [`ToolInvoker`].
#[derive(Debug, Clone)]
pub struct ToolSchedulerClient<I> {
    invoker: I,
}

impl<I: ToolInvoker> ToolSchedulerClient<I> {
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    fn call(&self, action: &'static str, args: Value) -> Result<ToolResponse, SchedulerError> {
        self.invoker
            .invoke(CRON_TOOL, &args)
            .map_err(|e| match e.downcast::<MalformedReply>() {
                Ok(reply) => SchedulerError::MalformedResponse {
                    action,
                    reason: reply.reason,
                    raw: reply.raw,
                },
                Err(e) => SchedulerError::Unavailable(e.to_string()),
            })
    }
}

impl<I: ToolInvoker> SchedulerClient for ToolSchedulerClient<I> {
    fn list(&self, include_disabled: bool) -> Result<Vec<ExternalJob>, SchedulerError> {
        let response = self.call("list", json!({ "action": "list", "includeDisabled": include_disabled }))?;
        parse_list(response.first_text())
    }

    fn create(&self, job: &JobSpec) -> Result<String, SchedulerError> {
        let response = self.call("add", json!({ "action": "add", "job": job }))?;
        parse_add(response.first_text())
    }

    fn update(&self, job_id: &str, patch: &JobPatch) -> Result<(), SchedulerError> {
        let response = self.call("update", json!({ "action": "update", "jobId": job_id, "patch": patch }))?;
        parse_update(response.first_text())
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// `list`: missing or non-JSON text means no jobs.
pub fn parse_list(text: Option<&str>) -> Result<Vec<ExternalJob>, SchedulerError> {
    let Some(raw) = text else {
        return Ok(Vec::new());
    };
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => {
            tracing::debug!("scheduler list returned non-JSON text; treating as empty");
            return Ok(Vec::new());
        }
    };
    check_tool_error(&value)?;

    let jobs = match value {
        Value::Array(_) => value,
        Value::Object(mut obj) => match obj.remove("jobs") {
            Some(jobs @ Value::Array(_)) => jobs,
            Some(Value::Null) | None => {
                return Err(malformed("list", "missing 'jobs' array", raw));
            }
            Some(_) => return Err(malformed("list", "'jobs' is not an array", raw)),
        },
        _ => return Err(malformed("list", "expected an object", raw)),
    };
    serde_json::from_value(jobs).map_err(|e| malformed("list", &e.to_string(), raw))
}

/// `add`: the new id at `id` or `job.id`.
pub fn parse_add(text: Option<&str>) -> Result<String, SchedulerError> {
    let Some(raw) = text else {
        return Err(SchedulerError::MissingIdInResponse { raw: String::new() });
    };
    let value: Value =
        serde_json::from_str(raw).map_err(|e| malformed("add", &e.to_string(), raw))?;
    check_tool_error(&value)?;

    let id = value
        .get("id")
        .or_else(|| value.get("job").and_then(|job| job.get("id")))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty());
    match id {
        Some(id) => Ok(id.to_string()),
        None => Err(SchedulerError::MissingIdInResponse {
            raw: raw.to_string(),
        }),
    }
}

/// `update`: any JSON acknowledgement, or no text at all.
pub fn parse_update(text: Option<&str>) -> Result<(), SchedulerError> {
    let Some(raw) = text else {
        return Ok(());
    };
    let value: Value =
        serde_json::from_str(raw).map_err(|e| malformed("update", &e.to_string(), raw))?;
    check_tool_error(&value)
}

/// An in-band `{ "ok": false, "error": … }` is a tool failure.
fn check_tool_error(value: &Value) -> Result<(), SchedulerError> {
    if value.get("ok").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .map(|e| match e {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "tool reported failure".to_string());
        return Err(SchedulerError::Unavailable(message));
    }
    Ok(())
}

fn malformed(action: &'static str, reason: &str, raw: &str) -> SchedulerError {
    SchedulerError::MalformedResponse {
        action,
        reason: reason.to_string(),
        raw: raw.to_string(),
    }
}
