//! # recipes-sync
//!
//! Keeps the cron jobs a recipe declares in step with an external scheduler.
//!
//! Call [`reconcile`] with normalized jobs, a [`SchedulerClient`], and a
//! [`Prompter`]; re-running it with the same input converges to the same
//! scheduler state and leaves the mapping store unchanged.

pub mod error;
pub mod mapping_store;
pub mod policy;
pub mod reconciler;
pub mod scheduler;
pub mod spec_hash;
pub mod team_jobs;

pub use error::{MalformedReply, SchedulerError, SyncError};
pub use policy::{FixedAnswer, NonInteractive, PolicyDecision, Prompter, SkipReason};
pub use reconciler::{
    reconcile, ActionCounts, JobAction, JobOutcome, ReconcileRequest, ReconcileSummary,
    RemovedOutcome,
};
pub use scheduler::{
    JobPatch, JobSpec, SchedulerClient, ToolInvoker, ToolResponse, ToolSchedulerClient,
    TransportError,
};
pub use team_jobs::{plan_team_removal, RemovalPlan};
