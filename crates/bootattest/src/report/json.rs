//! Structured JSON report renderer.

use bootattest_core::differ::Finding;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Summary {
    total: usize,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    version: u32,
    findings: &'a [Finding],
    summary: Summary,
}

pub fn render(findings: &[Finding]) -> String {
    let report = Report {
        version: 1,
        findings,
        summary: Summary {
            total: findings.len(),
        },
    };
    serde_json::to_string_pretty(&report).expect("Finding serialization never fails")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootattest_core::differ::FindingKind;
    use bootattest_core::policy::Severity;

    #[test]
    fn renders_stable_field_order_and_summary_total() {
        let findings = vec![Finding {
            kind: FindingKind::VarMismatch,
            id: "SecureBoot-guid".to_string(),
            severity: Severity::High,
            message: "expected aa, observed bb".to_string(),
        }];
        let body = render(&findings);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["summary"]["total"], 1);
        assert_eq!(value["findings"][0]["kind"], "var-mismatch");
    }
}
