//! Test-report XML renderer.

use bootattest_core::differ::Finding;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render findings as a single JUnit-style test suite. `threshold_rank` is
/// the `--fail-on` rank (see [`bootattest_core::policy::Severity::rank`]);
/// passing a rank above the highest severity (5) means no finding ever gets
/// a `<failure>` child.
pub fn render(findings: &[Finding], threshold_rank: u8) -> String {
    let tests = findings.len().max(1);
    let mut body = String::new();

    if findings.is_empty() {
        body.push_str(
            "  <testcase classname=\"attestation\" name=\"baseline\"></testcase>\n",
        );
    } else {
        for f in findings {
            if f.severity.rank() >= threshold_rank {
                body.push_str(&format!(
                    "  <testcase classname=\"{}\" name=\"{}\"><failure message=\"{}\">{}:{}:{}</failure></testcase>\n",
                    escape(&f.kind.to_string()),
                    escape(&f.id),
                    escape(&f.message),
                    escape(&f.kind.to_string()),
                    escape(&f.id),
                    escape(&f.severity.to_string()),
                ));
            } else {
                body.push_str(&format!(
                    "  <testcase classname=\"{}\" name=\"{}\"></testcase>\n",
                    escape(&f.kind.to_string()),
                    escape(&f.id),
                ));
            }
        }
    }

    format!(
        "<testsuite name=\"bootattestor\" tests=\"{tests}\">\n{body}</testsuite>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootattest_core::differ::FindingKind;
    use bootattest_core::policy::Severity;

    #[test]
    fn empty_findings_render_one_passing_test_case() {
        let xml = render(&[], Severity::Medium.rank());
        assert!(xml.contains("tests=\"1\""));
        assert!(xml.contains("name=\"baseline\""));
        assert!(!xml.contains("<failure"));
    }

    #[test]
    fn finding_at_or_above_threshold_gets_a_failure_child() {
        let findings = vec![Finding {
            kind: FindingKind::PcrMismatch,
            id: "REG7.sha256".to_string(),
            severity: Severity::Critical,
            message: "m".to_string(),
        }];
        let xml = render(&findings, Severity::High.rank());
        assert!(xml.contains("tests=\"1\""));
        assert!(xml.contains("<failure"));
    }

    #[test]
    fn finding_below_threshold_has_no_failure_child() {
        let findings = vec![Finding {
            kind: FindingKind::PcrMismatch,
            id: "REG7.sha256".to_string(),
            severity: Severity::Low,
            message: "m".to_string(),
        }];
        let xml = render(&findings, Severity::High.rank());
        assert!(!xml.contains("<failure"));
    }

    #[test]
    fn threshold_above_critical_never_yields_a_failure_child() {
        let findings = vec![Finding {
            kind: FindingKind::PcrMismatch,
            id: "REG7.sha256".to_string(),
            severity: Severity::Critical,
            message: "m".to_string(),
        }];
        let xml = render(&findings, u8::MAX);
        assert!(!xml.contains("<failure"));
    }
}
