//! Category Configuration - Enforceable Contracts
//!
//! A category maps a path-like source identifier to a target pixel width
//! and an output policy. The table drives the whole run; it is never
//! mutated after loading.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {}", .0.display(), .1)]
    Read(PathBuf, #[source] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("category \"{0}\" has zero target width")]
    ZeroWidth(String),

    #[error("duplicate category \"{0}\"")]
    DuplicateCategory(String),

    #[error("invalid version string \"{0}\"")]
    InvalidVersion(String),

    #[error("config requires engine >= {0}, current is {1}")]
    EngineVersionMismatch(String, String),
}

/// What a category writes into the output tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Rename to `.webp`, drop the alpha channel, encode lossless WebP.
    #[default]
    Webp,
    /// Keep the input filename and pixel format unchanged (still resized).
    Preserve,
}

/// What happens when a single file fails to convert.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// First failure aborts the whole run.
    #[default]
    Abort,
    /// Record the failure in the report and keep going.
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpec {
    /// Path-like identifier under the source root, e.g. `skillCards/icons`.
    pub source: String,
    /// Target pixel width; height scales proportionally.
    pub width: u32,
    #[serde(default)]
    pub policy: OutputPolicy,
}

impl CategorySpec {
    /// Output subdirectory for this category, relative to the output root.
    pub fn output_slug(&self) -> String {
        snake_slug(&self.source)
    }

    /// Output filename for a given input filename under this category's
    /// policy. The rename never touches the filesystem; whether the input
    /// is ever opened is decided separately.
    pub fn output_name(&self, input: &str) -> String {
        match self.policy {
            OutputPolicy::Preserve => input.to_string(),
            OutputPolicy::Webp => webp_name(input),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTable {
    /// Minimum engine version this config was written for.
    #[serde(default)]
    pub engine_min_version: Option<String>,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    #[serde(default)]
    pub failure_mode: FailureMode,
    pub categories: Vec<CategorySpec>,
}

impl CategoryTable {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let table: Self = serde_json::from_str(&content)?;
        table.validate()?;
        Ok(table)
    }

    /// Structural checks. `load_from_path` runs this; tables built in code
    /// get the same guarantees by calling it directly. Whether each source
    /// subdirectory actually exists is a run-time question, not a config
    /// question.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bound) = &self.engine_min_version {
            let min = semver::Version::parse(bound)
                .map_err(|_| ConfigError::InvalidVersion(bound.clone()))?;
            let engine = semver::Version::parse(crate::ENGINE_VERSION)
                .map_err(|_| ConfigError::InvalidVersion(crate::ENGINE_VERSION.to_string()))?;
            if engine < min {
                return Err(ConfigError::EngineVersionMismatch(
                    bound.clone(),
                    crate::ENGINE_VERSION.to_string(),
                ));
            }
        }

        let mut seen = HashSet::new();
        for spec in &self.categories {
            if spec.width == 0 {
                return Err(ConfigError::ZeroWidth(spec.source.clone()));
            }
            if !seen.insert(spec.source.as_str()) {
                return Err(ConfigError::DuplicateCategory(spec.source.clone()));
            }
        }

        Ok(())
    }
}

/// Derive the output directory name from a category identifier: an
/// underscore goes in front of each maximal run of ASCII uppercase letters
/// (a leading run included), then the whole string is lowercased. Path
/// separators pass through, so nested identifiers yield nested directories.
pub fn snake_slug(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 4);
    let mut in_upper_run = false;
    for c in id.chars() {
        if c.is_ascii_uppercase() {
            if !in_upper_run {
                out.push('_');
                in_upper_run = true;
            }
            out.push(c.to_ascii_lowercase());
        } else {
            in_upper_run = false;
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn webp_name(input: &str) -> String {
    for ext in [".png", ".jpg"] {
        if let Some(stem) = input.strip_suffix(ext) {
            return format!("{}.webp", stem);
        }
    }
    input.to_string()
}
