//! Severity policy (C5).
//!
//! Maps a register index to a [`Severity`] bucket. The default policy
//! mirrors spec.md §6's defaults; a caller may load an override document
//! from JSON, hand-validated the same way the baseline document is.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AttestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Rank used by the `--fail-on` threshold and the JUnit renderer:
    /// info=1 .. critical=5.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Low => 2,
            Severity::Medium => 3,
            Severity::High => 4,
            Severity::Critical => 5,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub critical: BTreeSet<u32>,
    #[serde(default)]
    pub high: BTreeSet<u32>,
    #[serde(default)]
    pub medium: BTreeSet<u32>,
    #[serde(default)]
    pub low: BTreeSet<u32>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            critical: BTreeSet::from([7]),
            high: BTreeSet::from([0, 2, 4, 5]),
            medium: BTreeSet::new(),
            low: BTreeSet::new(),
        }
    }
}

impl Policy {
    /// Severity for a register index not named in any bucket.
    const UNLISTED: Severity = Severity::Low;

    pub fn severity_for(&self, register_index: u32) -> Severity {
        if self.critical.contains(&register_index) {
            Severity::Critical
        } else if self.high.contains(&register_index) {
            Severity::High
        } else if self.medium.contains(&register_index) {
            Severity::Medium
        } else if self.low.contains(&register_index) {
            Severity::Low
        } else {
            Self::UNLISTED
        }
    }

    /// Parse a policy document, rejecting anything that isn't a JSON object
    /// at the top level (spec.md §6).
    pub fn from_json(body: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| AttestError::schema(format!("policy JSON parse failed: {e}")))?;
        if !value.is_object() {
            return Err(AttestError::schema("policy document must be a JSON object"));
        }
        serde_json::from_value(value)
            .map_err(|e| AttestError::schema(format!("policy document malformed: {e}")))
    }
}
