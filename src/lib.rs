//! WebImages Core - Batch Web Asset Converter
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Source Images Are Truth
//! 2. Categories Are Contracts
//! 3. Existing Outputs Are Never Rewritten
//! 4. Deterministic Output
//! 5. Reports Enable Reproduction

pub mod config;
pub mod hashing;
pub mod pipeline;
pub mod report;

pub use config::{CategoryTable, CategorySpec, ConfigError, FailureMode, OutputPolicy};
pub use hashing::{compute_config_hash, compute_manifest_hash, canonical_json};
pub use pipeline::{Converter, ConvertError};
pub use report::{RunReport, CategoryReport, ConvertedFile, RunPlan};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
