//! Hashing System - SHA-256 for Run Manifests
//!
//! Hashes appear in reports so a run can be audited and reproduced. They
//! are never consulted when deciding whether a file needs converting; the
//! skip check is a filesystem stat and nothing else.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::CategoryTable;

/// SHA-256 of raw bytes as a lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Canonical JSON: object keys sorted recursively, no whitespace. The sort
/// is explicit so hashes stay stable even if a `preserve_order` feature is
/// unified into serde_json by some other dependency.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize(v))
}

fn canonicalize(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Hash of a full run report (or any other manifest-shaped value).
pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Hash identifying the configuration a run executed under:
/// config_hash = sha256(canonical_table + ":" + engine_version).
/// Same table and same engine always hash the same.
pub fn compute_config_hash(
    table: &CategoryTable,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(table)?;
    let combined = format!("{}:{}", canonical, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategorySpec, CategoryTable, FailureMode, OutputPolicy};
    use serde_json::json;
    use std::path::PathBuf;

    fn test_table(width: u32) -> CategoryTable {
        CategoryTable {
            engine_min_version: None,
            source_root: PathBuf::from("in"),
            output_root: PathBuf::from("out"),
            failure_mode: FailureMode::Abort,
            categories: vec![CategorySpec {
                source: "appIcons".to_string(),
                width,
                policy: OutputPolicy::Webp,
            }],
        }
    }

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_canonical_json_sorts_nested_objects() {
        let obj1 = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
        let obj2 = json!({"a": 2, "m": {"a": 2, "b": 1}, "z": 1});
        assert_eq!(canonical_json(&obj1).unwrap(), canonical_json(&obj2).unwrap());
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        assert_eq!(sha256_hex(data), sha256_hex(data));
    }

    #[test]
    fn test_config_hash_stable_and_width_sensitive() {
        let h1 = compute_config_hash(&test_table(96), "1.0.0").unwrap();
        let h2 = compute_config_hash(&test_table(96), "1.0.0").unwrap();
        let h3 = compute_config_hash(&test_table(500), "1.0.0").unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_config_hash_engine_sensitive() {
        let h1 = compute_config_hash(&test_table(96), "1.0.0").unwrap();
        let h2 = compute_config_hash(&test_table(96), "2.0.0").unwrap();
        assert_ne!(h1, h2);
    }
}
