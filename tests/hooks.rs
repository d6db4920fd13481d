//! Decode-counter checks, compiled only with --features test-hooks.
//!
//! Proves idempotence at the syscall level: a second run over an unchanged
//! tree opens zero images.

#![cfg(feature = "test-hooks")]

use std::fs;

use image::{Rgb, RgbImage};

use webimages_core::pipeline::{get_decode_call_count, reset_decode_call_count};
use webimages_core::{CategorySpec, CategoryTable, Converter, FailureMode, OutputPolicy};

#[test]
fn hook_second_run_decodes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let source_root = tmp.path().join("images");
    let output_root = tmp.path().join("docs");
    fs::create_dir_all(source_root.join("icons")).unwrap();
    RgbImage::from_pixel(100, 100, Rgb([6, 6, 6]))
        .save(source_root.join("icons").join("a.png"))
        .unwrap();

    let converter = Converter::new(CategoryTable {
        engine_min_version: None,
        source_root,
        output_root,
        failure_mode: FailureMode::Abort,
        categories: vec![CategorySpec {
            source: "icons".to_string(),
            width: 48,
            policy: OutputPolicy::Webp,
        }],
    });

    reset_decode_call_count();
    converter.run().unwrap();
    assert_eq!(get_decode_call_count(), 1);

    converter.run().unwrap();
    assert_eq!(get_decode_call_count(), 1);
}
