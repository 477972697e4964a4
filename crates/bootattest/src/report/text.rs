//! Plain-text report renderer.

use bootattest_core::differ::Finding;

pub fn render(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "OK: no mismatches".to_string();
    }
    let mut lines: Vec<String> = findings
        .iter()
        .map(|f| {
            format!(
                "{} {} {} - {}",
                f.severity.to_string().to_uppercase(),
                f.kind,
                f.id,
                f.message
            )
        })
        .collect();
    lines.push(format!("Total: {}", findings.len()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootattest_core::differ::FindingKind;
    use bootattest_core::policy::Severity;

    #[test]
    fn empty_findings_render_ok_line() {
        assert_eq!(render(&[]), "OK: no mismatches");
    }

    #[test]
    fn one_finding_renders_one_line_plus_total() {
        let findings = vec![Finding {
            kind: FindingKind::PcrMismatch,
            id: "REG7.sha256".to_string(),
            severity: Severity::Critical,
            message: "expected aa, observed bb".to_string(),
        }];
        let rendered = render(&findings);
        assert_eq!(
            rendered,
            "CRITICAL pcr-mismatch REG7.sha256 - expected aa, observed bb\nTotal: 1"
        );
    }
}
