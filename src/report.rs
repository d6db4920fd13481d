//! Run Manifests - Reports Enable Reproduction
//!
//! Every run produces a `RunReport`; a dry run produces the parallel
//! `RunPlan`. Reports record what was written, skipped, and ignored, with
//! enough hashes to audit the run afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FailureMode, OutputPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: String,
    pub engine_version: String,
    pub config_hash: String,
    pub failure_mode: FailureMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub categories: Vec<CategoryReport>,
    pub manifest_hash: String,
}

impl RunReport {
    pub fn total_converted(&self) -> usize {
        self.categories.iter().map(|c| c.converted.len()).sum()
    }

    pub fn total_skipped(&self) -> u32 {
        self.categories.iter().map(|c| c.skipped).sum()
    }

    pub fn total_ignored(&self) -> u32 {
        self.categories.iter().map(|c| c.ignored).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.categories.iter().any(|c| !c.failures.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub source: String,
    /// Snake-cased subdirectory under the output root.
    pub output_dir: String,
    pub target_width: u32,
    pub policy: OutputPolicy,
    pub converted: Vec<ConvertedFile>,
    /// Entries whose output path already held a file.
    pub skipped: u32,
    /// Entries the pipeline never opened: non-`.png` names, subdirectories.
    pub ignored: u32,
    /// Per-file errors; populated only under `FailureMode::Continue`.
    pub failures: Vec<FileFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedFile {
    pub filename: String,
    pub output: String,
    pub size: [u32; 2],
    pub bytes: u64,
    /// SHA-256 of the written bytes. An audit record, not a cache key.
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

/// Dry-run mirror of `RunReport`. Producing one stats the filesystem but
/// never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlan {
    pub engine_version: String,
    pub config_hash: String,
    pub generated_at: DateTime<Utc>,
    pub categories: Vec<CategoryPlan>,
}

impl RunPlan {
    pub fn total_planned(&self) -> usize {
        self.categories.iter().map(|c| c.convert.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPlan {
    pub source: String,
    pub output_dir: String,
    pub target_width: u32,
    pub policy: OutputPolicy,
    pub convert: Vec<PlannedConversion>,
    pub skip: Vec<String>,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedConversion {
    pub filename: String,
    pub output: String,
}
