//! Recipes core library — domain types, declared-job normalization, recipe
//! front matter, operator config, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes, mapping keys and persisted records
//! - [`normalize`] — raw `cronJobs` → [`DeclaredJob`]
//! - [`recipe`] — front-matter extraction
//! - [`config`] — `~/.recipes/config.yaml` load / save
//! - [`error`] — [`SpecError`], [`RecipeError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod normalize;
pub mod recipe;
pub mod types;

pub use error::{ConfigError, RecipeError, SpecError};
pub use normalize::normalize_cron_jobs;
pub use recipe::{parse_recipe, Recipe};
pub use types::{
    DeclaredJob, ExternalJob, InstallMode, MappingEntry, MappingKey, MappingState, Owner,
    OwnerKind, RecipeId, MAPPING_VERSION,
};
