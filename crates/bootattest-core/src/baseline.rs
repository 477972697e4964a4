//! Baseline store (C4).
//!
//! The baseline document is a schema-versioned JSON resource. Validation is
//! a hand-rolled targeted checker over the fields in the documented schema
//! (spec.md §6), in the teacher's style: `evidence_compliance.rs` hand-rolls
//! artifact-index schema checks rather than pulling in a general
//! JSON-schema crate.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AttestError, Result};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub schema_version: u32,
    pub platform: String,
    pub digests: BTreeMap<String, BTreeMap<String, String>>,
    pub variables: BTreeMap<String, String>,
    pub created_at: u64,
}

impl Baseline {
    /// Validate the fields documented in spec.md §6. Any violation is a
    /// fatal `schema_error`.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(AttestError::schema(format!(
                "unsupported schema_version {}, expected {SCHEMA_VERSION}",
                self.schema_version
            )));
        }
        if self.platform.is_empty() {
            return Err(AttestError::schema("platform must be non-empty"));
        }
        for (alg, registers) in &self.digests {
            for (index_str, digest_hex) in registers {
                let index: u32 = index_str
                    .parse()
                    .map_err(|_| AttestError::schema(format!("non-decimal register index '{index_str}' in digests[{alg}]")))?;
                if index > 23 {
                    return Err(AttestError::schema(format!(
                        "register index {index} out of range 0..23 in digests[{alg}]"
                    )));
                }
                if digest_hex.is_empty() || !digest_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(AttestError::schema(format!(
                        "non-hex digest for digests[{alg}][{index_str}]"
                    )));
                }
            }
        }
        for digest_hex in self.variables.values() {
            if digest_hex.is_empty() || !digest_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AttestError::schema("non-hex digest in variables"));
            }
        }
        Ok(())
    }
}

/// Load and schema-validate a baseline document from `path`.
pub fn load_baseline(path: &Path) -> Result<Baseline> {
    let content = std::fs::read_to_string(path)?;
    let baseline: Baseline = serde_json::from_str(&content)
        .map_err(|e| AttestError::schema(format!("baseline JSON parse failed: {e}")))?;
    baseline.validate()?;
    Ok(baseline)
}

/// Validate, then write a baseline document to `path` as pretty JSON.
pub fn save_baseline(path: &Path, baseline: &Baseline) -> Result<()> {
    baseline.validate()?;
    let body = serde_json::to_string_pretty(baseline)
        .map_err(|e| AttestError::schema(format!("baseline serialization failed: {e}")))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Baseline {
        let mut registers = BTreeMap::new();
        registers.insert("7".to_string(), "aa".repeat(32));
        let mut digests = BTreeMap::new();
        digests.insert("sha256".to_string(), registers);

        let mut variables = BTreeMap::new();
        variables.insert(
            "SecureBoot-8be4df61-93ca-11d2-aa0d-00e098032b8c".to_string(),
            "bb".repeat(32),
        );

        Baseline {
            schema_version: SCHEMA_VERSION,
            platform: "linux".to_string(),
            digests,
            variables,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = std::env::temp_dir().join(format!("bootattest-baseline-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("baseline.json");

        let baseline = sample();
        save_baseline(&path, &baseline).unwrap();
        let loaded = load_baseline(&path).unwrap();
        assert_eq!(loaded, baseline);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_wrong_schema_version() {
        let mut baseline = sample();
        baseline.schema_version = 2;
        assert!(baseline.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_register_index() {
        let mut baseline = sample();
        baseline
            .digests
            .get_mut("sha256")
            .unwrap()
            .insert("24".to_string(), "cc".repeat(32));
        assert!(baseline.validate().is_err());
    }

    #[test]
    fn rejects_non_hex_digest() {
        let mut baseline = sample();
        baseline
            .digests
            .get_mut("sha256")
            .unwrap()
            .insert("1".to_string(), "not-hex!!".to_string());
        assert!(baseline.validate().is_err());
    }
}
