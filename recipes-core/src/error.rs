//! Error types for recipes-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while normalizing a recipe's declared cron jobs.
///
/// Both variants abort before any scheduler or storage interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// The declared job list (or one of its entries) has the wrong shape.
    #[error("invalid cronJobs: {0}")]
    InvalidSpec(String),

    /// Two entries share the same `id` within one recipe.
    #[error("duplicate cronJobs[].id: {0}")]
    DuplicateId(String),
}

/// Failures while splitting a recipe document into front matter and body.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("recipe markdown must start with YAML frontmatter (---)")]
    MissingFrontmatter,

    #[error("recipe frontmatter not terminated (---)")]
    UnterminatedFrontmatter,

    #[error("recipe frontmatter must include id")]
    MissingId,

    #[error("failed to parse recipe frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// All errors that can arise from loading or saving operator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
