//! Conversion Pipeline - Single Entry Point
//!
//! CRITICAL: an output already on disk is never rewritten, and the
//! presence check runs before the extension guard. No bypass.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{CategorySpec, CategoryTable, FailureMode, OutputPolicy};
use crate::hashing::{compute_config_hash, compute_manifest_hash, sha256_hex};
use crate::report::{
    CategoryPlan, CategoryReport, ConvertedFile, FileFailure, PlannedConversion, RunPlan,
    RunReport,
};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static DECODE_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_decode_call_count() -> u32 {
    DECODE_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_decode_call_count() {
    DECODE_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("source directory not found: {}", .0.display())]
    SourceDirMissing(PathBuf),

    #[error("failed to list {}: {}", .0.display(), .1)]
    ListDir(PathBuf, #[source] io::Error),

    #[error("failed to create output directory {}: {}", .0.display(), .1)]
    CreateDir(PathBuf, #[source] io::Error),

    #[error("failed to decode {}: {}", .0.display(), .1)]
    Decode(PathBuf, #[source] image::ImageError),

    #[error("failed to encode {}: {}", .0.display(), .1)]
    Encode(PathBuf, #[source] image::ImageError),

    #[error("failed to write {}: {}", .0.display(), .1)]
    Write(PathBuf, #[source] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The conversion pipeline - single entry point for batch runs.
pub struct Converter {
    table: CategoryTable,
}

impl Converter {
    pub fn new(table: CategoryTable) -> Self {
        Self { table }
    }

    /// Run the batch: one pass over every category in table order, creating
    /// output directories, converting whatever is missing, and returning
    /// the manifest of what happened.
    pub fn run(&self) -> Result<RunReport, ConvertError> {
        let started_at = Utc::now();
        let config_hash = compute_config_hash(&self.table, ENGINE_VERSION)?;

        let mut categories = Vec::with_capacity(self.table.categories.len());
        for spec in &self.table.categories {
            categories.push(self.run_category(spec)?);
        }

        let mut report = RunReport {
            id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            config_hash,
            failure_mode: self.table.failure_mode,
            started_at,
            finished_at: Utc::now(),
            categories,
            manifest_hash: String::new(), // Computed after
        };
        report.manifest_hash = compute_manifest_hash(&report)?;

        Ok(report)
    }

    /// Classify every entry the way `run` would, without creating
    /// directories or writing a single byte.
    pub fn plan(&self) -> Result<RunPlan, ConvertError> {
        let config_hash = compute_config_hash(&self.table, ENGINE_VERSION)?;

        let mut categories = Vec::with_capacity(self.table.categories.len());
        for spec in &self.table.categories {
            categories.push(self.plan_category(spec)?);
        }

        Ok(RunPlan {
            engine_version: ENGINE_VERSION.to_string(),
            config_hash,
            generated_at: Utc::now(),
            categories,
        })
    }

    fn run_category(&self, spec: &CategorySpec) -> Result<CategoryReport, ConvertError> {
        // Directory creation comes first, before the source listing can
        // fail: an empty category still leaves its output directory behind.
        let out_dir = self.table.output_root.join(spec.output_slug());
        fs::create_dir_all(&out_dir).map_err(|e| ConvertError::CreateDir(out_dir.clone(), e))?;

        let src_dir = self.table.source_root.join(&spec.source);
        let mut report = CategoryReport {
            source: spec.source.clone(),
            output_dir: spec.output_slug(),
            target_width: spec.width,
            policy: spec.policy,
            converted: vec![],
            skipped: 0,
            ignored: 0,
            failures: vec![],
        };

        for entry in list_entries(&src_dir)? {
            match classify(&entry, spec, &out_dir) {
                EntryAction::Skip => report.skipped += 1,
                EntryAction::Ignore => report.ignored += 1,
                EntryAction::Convert { output_name } => {
                    let out_path = out_dir.join(&output_name);
                    match convert_file(&entry, &out_path, output_name, spec) {
                        Ok(converted) => report.converted.push(converted),
                        Err(e) => match self.table.failure_mode {
                            FailureMode::Abort => return Err(e),
                            FailureMode::Continue => report.failures.push(FileFailure {
                                filename: entry.name.clone(),
                                error: e.to_string(),
                            }),
                        },
                    }
                }
            }
        }

        Ok(report)
    }

    fn plan_category(&self, spec: &CategorySpec) -> Result<CategoryPlan, ConvertError> {
        let out_dir = self.table.output_root.join(spec.output_slug());
        let src_dir = self.table.source_root.join(&spec.source);

        let mut plan = CategoryPlan {
            source: spec.source.clone(),
            output_dir: spec.output_slug(),
            target_width: spec.width,
            policy: spec.policy,
            convert: vec![],
            skip: vec![],
            ignore: vec![],
        };

        for entry in list_entries(&src_dir)? {
            match classify(&entry, spec, &out_dir) {
                EntryAction::Convert { output_name } => plan.convert.push(PlannedConversion {
                    filename: entry.name,
                    output: output_name,
                }),
                EntryAction::Skip => plan.skip.push(entry.name),
                EntryAction::Ignore => plan.ignore.push(entry.name),
            }
        }

        Ok(plan)
    }
}

struct DirEntryInfo {
    name: String,
    path: PathBuf,
}

enum EntryAction {
    Convert { output_name: String },
    Skip,
    Ignore,
}

/// Non-recursive listing in sorted filename order. Order never changes what
/// gets written, only the order of report entries.
fn list_entries(dir: &Path) -> Result<Vec<DirEntryInfo>, ConvertError> {
    let read = fs::read_dir(dir).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ConvertError::SourceDirMissing(dir.to_path_buf())
        } else {
            ConvertError::ListDir(dir.to_path_buf(), e)
        }
    })?;

    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| ConvertError::ListDir(dir.to_path_buf(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push(DirEntryInfo {
            name,
            path: entry.path(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(entries)
}

/// The per-entry decision, in contract order: rename, presence check, then
/// the `.png` guard. A `.jpg` name gets a `.webp` slot in step one but
/// never passes the guard, so it is renamed yet never read.
fn classify(entry: &DirEntryInfo, spec: &CategorySpec, out_dir: &Path) -> EntryAction {
    let output_name = spec.output_name(&entry.name);
    if out_dir.join(&output_name).is_file() {
        return EntryAction::Skip;
    }
    if entry.path.is_file() && entry.name.ends_with(".png") {
        EntryAction::Convert { output_name }
    } else {
        EntryAction::Ignore
    }
}

fn convert_file(
    entry: &DirEntryInfo,
    out_path: &Path,
    output_name: String,
    spec: &CategorySpec,
) -> Result<ConvertedFile, ConvertError> {
    #[cfg(feature = "test-hooks")]
    DECODE_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

    let img = image::open(&entry.path).map_err(|e| ConvertError::Decode(entry.path.clone(), e))?;
    let (orig_width, orig_height) = img.dimensions();
    let target_height = scaled_height(orig_width, orig_height, spec.width);
    let resized = img.resize_exact(spec.width, target_height, FilterType::Lanczos3);

    let bytes = match spec.policy {
        OutputPolicy::Preserve => {
            // Format follows the output filename, which equals the input
            // filename here; the extension guard means PNG in practice.
            let format = ImageFormat::from_path(out_path)
                .map_err(|e| ConvertError::Encode(out_path.to_path_buf(), e))?;
            let mut buf = Cursor::new(Vec::new());
            resized
                .write_to(&mut buf, format)
                .map_err(|e| ConvertError::Encode(out_path.to_path_buf(), e))?;
            buf.into_inner()
        }
        OutputPolicy::Webp => {
            // Alpha is dropped, not composited onto a background.
            let rgb = resized.to_rgb8();
            let mut buf = Vec::new();
            rgb.write_with_encoder(WebPEncoder::new_lossless(&mut buf))
                .map_err(|e| ConvertError::Encode(out_path.to_path_buf(), e))?;
            buf
        }
    };

    fs::write(out_path, &bytes).map_err(|e| ConvertError::Write(out_path.to_path_buf(), e))?;

    Ok(ConvertedFile {
        filename: entry.name.clone(),
        output: output_name,
        size: [spec.width, target_height],
        bytes: bytes.len() as u64,
        hash: sha256_hex(&bytes),
    })
}

/// round(h * t / w), clamped so extreme aspect ratios never request a
/// zero-height resize.
fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let exact = (height as u64 * target_width as u64) as f64 / width as f64;
    (exact.round() as u32).max(1)
}
