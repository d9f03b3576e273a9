//! Declared-job normalization.
//!
//! Recipes carry `cronJobs` as loosely-shaped front matter. [`normalize_cron_jobs`]
//! is the only place that sees the untyped value; everything downstream works on
//! [`DeclaredJob`].

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::SpecError;
use crate::types::DeclaredJob;

/// Keys accepted as the job payload, in priority order.
const MESSAGE_KEYS: [&str; 3] = ["message", "task", "prompt"];

/// Validate and canonicalize a recipe's raw `cronJobs` value.
///
/// Absent or `null` input is an empty list. Order is preserved.
pub fn normalize_cron_jobs(raw: Option<&Value>) -> Result<Vec<DeclaredJob>, SpecError> {
    let items = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(SpecError::InvalidSpec(
                "frontmatter.cronJobs must be an array".to_string(),
            ))
        }
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(obj) = item else {
            return Err(SpecError::InvalidSpec(format!(
                "cronJobs[{index}] must be an object"
            )));
        };

        let id = scalar(obj, "id", index)?.unwrap_or_default();
        if id.is_empty() {
            return Err(SpecError::InvalidSpec(format!(
                "cronJobs[{index}].id is required"
            )));
        }
        if !seen.insert(id.clone()) {
            return Err(SpecError::DuplicateId(id));
        }

        let schedule = scalar(obj, "schedule", index)?.unwrap_or_default();
        if schedule.is_empty() {
            return Err(SpecError::InvalidSpec(format!(
                "cronJobs[{id}].schedule is required"
            )));
        }

        let mut message = String::new();
        for key in MESSAGE_KEYS {
            if let Some(value) = scalar(obj, key, index)? {
                if !value.is_empty() {
                    message = value;
                    break;
                }
            }
        }
        if message.is_empty() {
            return Err(SpecError::InvalidSpec(format!(
                "cronJobs[{id}].message is required"
            )));
        }

        let enabled_by_default = match obj.get("enabledByDefault") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(SpecError::InvalidSpec(format!(
                    "cronJobs[{id}].enabledByDefault must be a boolean"
                )))
            }
        };

        out.push(DeclaredJob {
            name: optional(obj, "name", &id)?,
            description: optional(obj, "description", &id)?,
            timezone: optional(obj, "timezone", &id)?,
            channel: optional(obj, "channel", &id)?,
            to: optional(obj, "to", &id)?,
            agent_id: optional(obj, "agentId", &id)?,
            enabled_by_default,
            id,
            schedule,
            message,
        });
    }

    Ok(out)
}

/// A trimmed scalar field. Numbers are accepted and rendered as text.
fn scalar(obj: &Map<String, Value>, key: &str, index: usize) -> Result<Option<String>, SpecError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(SpecError::InvalidSpec(format!(
            "cronJobs[{index}].{key} must be a string"
        ))),
    }
}

/// An optional string field; blank values collapse to `None`.
fn optional(obj: &Map<String, Value>, key: &str, id: &str) -> Result<Option<String>, SpecError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(SpecError::InvalidSpec(format!(
            "cronJobs[{id}].{key} must be a string"
        ))),
    }
}
