//! Recipe front-matter extraction.
//!
//! Only the pieces cron synchronization needs: the recipe `id` and the raw
//! `cronJobs` value handed to [`crate::normalize`].

use serde_json::Value;

use crate::error::RecipeError;
use crate::types::RecipeId;

const FENCE: &str = "---\n";
const CLOSING_FENCE: &str = "\n---\n";

/// A recipe document's parsed front matter.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub frontmatter: Value,
}

impl Recipe {
    /// The untyped `cronJobs` entry, if present.
    pub fn cron_jobs(&self) -> Option<&Value> {
        self.frontmatter.get("cronJobs")
    }
}

/// Parse the YAML front matter of `markdown`; the body is ignored.
pub fn parse_recipe(markdown: &str) -> Result<Recipe, RecipeError> {
    let markdown = markdown.replace("\r\n", "\n");
    let rest = markdown
        .strip_prefix(FENCE)
        .ok_or(RecipeError::MissingFrontmatter)?;
    // An empty front-matter block closes immediately.
    let yaml = if rest.starts_with(FENCE) {
        ""
    } else {
        let end = rest
            .find(CLOSING_FENCE)
            .ok_or(RecipeError::UnterminatedFrontmatter)?;
        &rest[..end]
    };

    let frontmatter: Value = if yaml.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(yaml)?
    };
    let id = match frontmatter.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => RecipeId::from(s.trim()),
        _ => return Err(RecipeError::MissingId),
    };

    Ok(Recipe { id, frontmatter })
}
