//! Baseline differ (C6).
//!
//! Pure function of (baseline, current register banks, current variable
//! hashes, policy) producing an ordered, fixed-shape finding list (REDESIGN
//! FLAGS §9: `Finding` is a flat 4-field struct, not a dynamic attribute bag).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::policy::{Policy, Severity};
use crate::replay::banks_to_hex;
use crate::tcg::AlgorithmId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    BankMissing,
    PcrMismatch,
    VarMismatch,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FindingKind::BankMissing => "bank-missing",
            FindingKind::PcrMismatch => "pcr-mismatch",
            FindingKind::VarMismatch => "var-mismatch",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub id: String,
    pub severity: Severity,
    pub message: String,
}

/// Diff a baseline against the current measured state.
///
/// `current_banks` and `current_variable_hashes` are already-hex-encoded
/// projections (see [`banks_to_hex`] and
/// [`crate::variables::hash_variables`]); the differ itself does no hashing.
pub fn diff(
    baseline: &Baseline,
    current_banks: &BTreeMap<AlgorithmId, crate::replay::RegisterBank>,
    current_variable_hashes: &BTreeMap<String, String>,
    policy: &Policy,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    let current_hex = banks_to_hex(current_banks);

    for alg in baseline.digests.keys() {
        if !current_hex.contains_key(alg) {
            findings.push(Finding {
                kind: FindingKind::BankMissing,
                id: alg.clone(),
                severity: Severity::High,
                message: format!("algorithm '{alg}' present in baseline is absent from current registers"),
            });
        }
    }

    for (alg, registers) in &baseline.digests {
        let Some(current_regs) = current_hex.get(alg) else {
            continue;
        };
        for (index_str, expected) in registers {
            let index: u32 = index_str.parse().expect("baseline already schema-validated");
            let observed = current_regs.get(&index);
            let matches = observed.is_some_and(|o| o.eq_ignore_ascii_case(expected));
            if !matches {
                let observed_display = observed.map_or("missing".to_string(), |o| o.clone());
                findings.push(Finding {
                    kind: FindingKind::PcrMismatch,
                    id: format!("REG{index}.{alg}"),
                    severity: policy.severity_for(index),
                    message: format!(
                        "expected {expected}, observed {observed_display}"
                    ),
                });
            }
        }
    }

    for (key, expected) in &baseline.variables {
        let observed = current_variable_hashes.get(key);
        let matches = observed.is_some_and(|o| o.eq_ignore_ascii_case(expected));
        if !matches {
            let observed_display = observed.map_or("missing".to_string(), |o| o.clone());
            findings.push(Finding {
                kind: FindingKind::VarMismatch,
                id: key.clone(),
                severity: Severity::High,
                message: format!("expected {expected}, observed {observed_display}"),
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcg::{ALG_SHA256, EV_SEPARATOR};
    use crate::variables::hash_variables;

    fn baseline_with(registers: BTreeMap<String, String>, variables: BTreeMap<String, String>) -> Baseline {
        let mut digests = BTreeMap::new();
        if !registers.is_empty() {
            digests.insert("sha256".to_string(), registers);
        }
        Baseline {
            schema_version: crate::baseline::SCHEMA_VERSION,
            platform: "linux".to_string(),
            digests,
            variables,
            created_at: 1_700_000_000,
        }
    }

    fn banks_for(events: &[(u32, u32, &[(AlgorithmId, &[u8])])]) -> BTreeMap<AlgorithmId, crate::replay::RegisterBank> {
        let blob = crate::tcg::test_fixtures::build_log(&[(ALG_SHA256, 32)], events);
        let (table, events) = crate::tcg::parse_event_log(&blob).unwrap();
        crate::replay::replay(&table, &events)
    }

    #[test]
    fn clean_match_produces_no_findings() {
        let digest = [0x11u8; 32];
        let banks = banks_for(&[(7, EV_SEPARATOR, &[(ALG_SHA256, &digest)])]);
        let hexed = banks_to_hex(&banks);
        let baseline = baseline_with(hexed["sha256"].iter().map(|(k, v)| (k.to_string(), v.clone())).collect(), BTreeMap::new());
        let findings = diff(&baseline, &banks, &BTreeMap::new(), &Policy::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn register_drift_is_reported_with_policy_severity() {
        let digest = [0x11u8; 32];
        let banks = banks_for(&[(7, EV_SEPARATOR, &[(ALG_SHA256, &digest)])]);
        let mut registers = BTreeMap::new();
        registers.insert("7".to_string(), "ff".repeat(32));
        let baseline = baseline_with(registers, BTreeMap::new());

        let findings = diff(&baseline, &banks, &BTreeMap::new(), &Policy::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::PcrMismatch);
        assert_eq!(findings[0].id, "REG7.sha256");
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn missing_algorithm_bank_is_reported() {
        let banks: BTreeMap<AlgorithmId, crate::replay::RegisterBank> = BTreeMap::new();
        let mut registers = BTreeMap::new();
        registers.insert("7".to_string(), "aa".repeat(32));
        let baseline = baseline_with(registers, BTreeMap::new());

        let findings = diff(&baseline, &banks, &BTreeMap::new(), &Policy::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::BankMissing);
        assert_eq!(findings[0].id, "sha256");
    }

    #[test]
    fn variable_mismatch_is_reported_as_high_severity() {
        let banks: BTreeMap<AlgorithmId, crate::replay::RegisterBank> = BTreeMap::new();
        let baseline = {
            let mut b = baseline_with(BTreeMap::new(), BTreeMap::new());
            b.variables.insert("SecureBoot-guid".to_string(), "aa".repeat(32));
            b
        };

        let mut current_vars = BTreeMap::new();
        current_vars.insert(
            ("SecureBoot".to_string(), "guid".to_string()),
            crate::variables::VariableValue {
                data: vec![0x02],
                attributes: 6,
            },
        );
        let current_hashes = hash_variables(&current_vars);

        let findings = diff(&baseline, &banks, &current_hashes, &Policy::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::VarMismatch);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn findings_order_is_bank_missing_then_pcr_then_var() {
        let digest = [0x11u8; 32];
        let banks = banks_for(&[(0, EV_SEPARATOR, &[(ALG_SHA256, &digest)])]);

        let mut registers = BTreeMap::new();
        registers.insert("0".to_string(), "ff".repeat(32));
        let mut digests = BTreeMap::new();
        digests.insert("sha256".to_string(), registers);
        digests.insert("sha384".to_string(), BTreeMap::from([("0".to_string(), "cc".repeat(48))]));

        let mut baseline = baseline_with(BTreeMap::new(), BTreeMap::new());
        baseline.digests = digests;
        baseline.variables.insert("X-guid".to_string(), "bb".repeat(32));

        let findings = diff(&baseline, &banks, &BTreeMap::new(), &Policy::default());
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].kind, FindingKind::BankMissing);
        assert_eq!(findings[0].id, "sha384");
        assert_eq!(findings[1].kind, FindingKind::PcrMismatch);
        assert_eq!(findings[2].kind, FindingKind::VarMismatch);
    }
}
