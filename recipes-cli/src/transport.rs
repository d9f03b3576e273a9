//! Concrete tool-call transports for the scheduler.
//!
//! - [`GatewayInvoker`] posts `{ tool, args }` to a running gateway.
//! - [`LocalJobsInvoker`] edits the scheduler's `jobs.json` directly, for
//!   offline installs and tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use recipes_core::config::{GatewayConfig, RecipesConfig, SchedulerKind};
use recipes_sync::{
    MalformedReply, SchedulerClient, ToolInvoker, ToolResponse, ToolSchedulerClient,
    TransportError,
};

/// Build the scheduler client selected by `kind`.
pub fn connect(
    kind: SchedulerKind,
    config: &RecipesConfig,
    home: &Path,
) -> Box<dyn SchedulerClient> {
    match kind {
        SchedulerKind::Gateway => {
            tracing::debug!("using gateway scheduler at {}", config.gateway.url);
            Box::new(ToolSchedulerClient::new(GatewayInvoker::new(&config.gateway)))
        }
        SchedulerKind::Local => {
            let path = config.local_jobs_path_at(home);
            tracing::debug!("using local scheduler file {}", path.display());
            Box::new(ToolSchedulerClient::new(LocalJobsInvoker::new(path)))
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// `POST <url>/tools/invoke` with an optional bearer token.
pub struct GatewayInvoker {
    agent: ureq::Agent,
    endpoint: String,
    token: Option<String>,
}

impl GatewayInvoker {
    pub fn new(config: &GatewayConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            endpoint: format!("{}/tools/invoke", config.url.trim_end_matches('/')),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        }
    }
}

impl ToolInvoker for GatewayInvoker {
    fn invoke(&self, tool: &str, args: &Value) -> Result<ToolResponse, TransportError> {
        let mut request = self.agent.post(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        let raw = match request.send_json(json!({ "tool": tool, "args": args })) {
            Ok(response) => response.into_string()?,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(format!("gateway returned HTTP {code}: {}", body.trim()).into());
            }
            Err(e) => return Err(e.to_string().into()),
        };
        parse_gateway_reply(&raw)
    }
}

/// `{ ok, result: { content: [...] } }`; a result without `content` is
/// passed on as a single JSON text block. A body that is not such an
/// envelope is a [`MalformedReply`] carrying the raw text.
fn parse_gateway_reply(raw: &str) -> Result<ToolResponse, TransportError> {
    let malformed = |reason: String| MalformedReply {
        reason,
        raw: raw.to_string(),
    };
    let reply: Value =
        serde_json::from_str(raw).map_err(|e| malformed(format!("gateway reply is not JSON: {e}")))?;

    if reply.get("ok").and_then(Value::as_bool) == Some(false) {
        let message = match reply.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(err) => err
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| err.to_string()),
            None => "tool invocation failed".to_string(),
        };
        return Err(format!("gateway: {message}").into());
    }

    let result = reply.get("result").unwrap_or(&reply);
    if result.get("content").is_some() {
        return serde_json::from_value(result.clone())
            .map_err(|e| malformed(format!("gateway returned malformed content: {e}")).into());
    }
    if result.is_null() {
        return Ok(ToolResponse::default());
    }
    Ok(ToolResponse::text(result.to_string()))
}

// ---------------------------------------------------------------------------
// Local jobs file
// ---------------------------------------------------------------------------

/// The scheduler's on-disk store: `{ "version": 1, "jobs": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CronStore {
    version: u32,
    #[serde(default)]
    jobs: Vec<Value>,
}

impl Default for CronStore {
    fn default() -> Self {
        Self {
            version: 1,
            jobs: Vec::new(),
        }
    }
}

/// Serves the `cron` tool's `list` / `add` / `update` actions from a jobs file.
#[derive(Debug, Clone)]
pub struct LocalJobsInvoker {
    path: PathBuf,
}

impl LocalJobsInvoker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn handle(&self, tool: &str, args: &Value) -> Result<Value> {
        if tool != recipes_sync::scheduler::CRON_TOOL {
            bail!("unknown tool '{tool}'");
        }
        let action = args
            .get("action")
            .and_then(Value::as_str)
            .context("missing 'action'")?;

        match action {
            "list" => {
                let include_disabled = args
                    .get("includeDisabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let store = self.load()?;
                let jobs: Vec<Value> = store
                    .jobs
                    .into_iter()
                    .filter(|job| include_disabled || job_enabled(job))
                    .collect();
                Ok(json!({ "jobs": jobs }))
            }
            "add" => {
                let Some(Value::Object(fields)) = args.get("job") else {
                    bail!("'add' requires a 'job' object");
                };
                let mut store = self.load()?;
                let now = Utc::now().timestamp_millis();
                let mut job = fields.clone();
                job.insert("id".into(), Value::String(next_id(&store, now)));
                job.insert("createdAtMs".into(), json!(now));
                job.insert("updatedAtMs".into(), json!(now));
                let job = Value::Object(job);
                store.jobs.push(job.clone());
                self.save(&store)?;
                Ok(json!({ "ok": true, "job": job }))
            }
            "update" => {
                let job_id = args
                    .get("jobId")
                    .and_then(Value::as_str)
                    .context("'update' requires 'jobId'")?;
                let Some(Value::Object(patch)) = args.get("patch") else {
                    bail!("'update' requires a 'patch' object");
                };
                let mut store = self.load()?;
                let Some(Value::Object(job)) = store
                    .jobs
                    .iter_mut()
                    .find(|job| job.get("id").and_then(Value::as_str) == Some(job_id))
                else {
                    return Ok(json!({ "ok": false, "error": format!("job not found: {job_id}") }));
                };
                merge_patch(job, patch);
                job.insert("updatedAtMs".into(), json!(Utc::now().timestamp_millis()));
                self.save(&store)?;
                Ok(json!({ "ok": true }))
            }
            other => Err(anyhow!("unsupported cron action '{other}'")),
        }
    }

    fn load(&self) -> Result<CronStore> {
        if !self.path.exists() {
            return Ok(CronStore::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid cron store: {}", self.path.display()))
    }

    fn save(&self, store: &CronStore) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut json = serde_json::to_string_pretty(store)?;
        json.push('\n');
        std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl ToolInvoker for LocalJobsInvoker {
    fn invoke(&self, tool: &str, args: &Value) -> Result<ToolResponse, TransportError> {
        let reply = self.handle(tool, args)?;
        Ok(ToolResponse::text(reply.to_string()))
    }
}

fn job_enabled(job: &Value) -> bool {
    job.get("enabled").and_then(Value::as_bool).unwrap_or(false)
}

fn next_id(store: &CronStore, now_ms: i64) -> String {
    let taken = |id: &str| {
        store
            .jobs
            .iter()
            .any(|job| job.get("id").and_then(Value::as_str) == Some(id))
    };
    let mut n = store.jobs.len();
    loop {
        let id = format!("job-{now_ms:x}-{n}");
        if !taken(&id) {
            return id;
        }
        n += 1;
    }
}

/// Top-level merge; `null` removes a field.
fn merge_patch(job: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            job.remove(key);
        } else {
            job.insert(key.clone(), value.clone());
        }
    }
}
