//! Code-scanning (SARIF 2.1.0) report renderer.

use std::collections::BTreeMap;

use bootattest_core::differ::Finding;
use bootattest_core::policy::Severity;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ShortDescription {
    text: String,
}

#[derive(Debug, Serialize)]
struct Rule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: ShortDescription,
}

#[derive(Debug, Serialize)]
struct Message {
    text: String,
}

#[derive(Debug, Serialize)]
struct Result_ {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: Message,
}

#[derive(Debug, Serialize)]
struct Driver {
    name: String,
    rules: Vec<Rule>,
}

#[derive(Debug, Serialize)]
struct Tool {
    driver: Driver,
}

#[derive(Debug, Serialize)]
struct Run {
    tool: Tool,
    results: Vec<Result_>,
}

#[derive(Debug, Serialize)]
struct Sarif {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<Run>,
}

fn level_for(severity: Severity) -> &'static str {
    match severity {
        Severity::High | Severity::Critical => "error",
        Severity::Medium => "warning",
        Severity::Low | Severity::Info => "note",
    }
}

pub fn render(findings: &[Finding]) -> String {
    let mut rules: BTreeMap<String, Rule> = BTreeMap::new();
    let mut results = Vec::with_capacity(findings.len());

    for f in findings {
        let rule_id = f.kind.to_string();
        rules.entry(rule_id.clone()).or_insert_with(|| Rule {
            id: rule_id.clone(),
            name: rule_id.clone(),
            short_description: ShortDescription {
                text: rule_id.clone(),
            },
        });
        results.push(Result_ {
            rule_id: rule_id.clone(),
            level: level_for(f.severity).to_string(),
            message: Message {
                text: format!("{}: {}", f.id, f.message),
            },
        });
    }

    let sarif = Sarif {
        version: "2.1.0".to_string(),
        schema: "https://json.schemastore.org/sarif-2.1.0.json".to_string(),
        runs: vec![Run {
            tool: Tool {
                driver: Driver {
                    name: "bootattest".to_string(),
                    rules: rules.into_values().collect(),
                },
            },
            results,
        }],
    };
    serde_json::to_string_pretty(&sarif).expect("Sarif serialization never fails")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootattest_core::differ::FindingKind;

    #[test]
    fn version_is_2_1_0_and_severity_maps_to_level() {
        let findings = vec![
            Finding {
                kind: FindingKind::PcrMismatch,
                id: "REG7.sha256".to_string(),
                severity: Severity::Critical,
                message: "m".to_string(),
            },
            Finding {
                kind: FindingKind::PcrMismatch,
                id: "REG1.sha256".to_string(),
                severity: Severity::Low,
                message: "m".to_string(),
            },
        ];
        let value: serde_json::Value = serde_json::from_str(&render(&findings)).unwrap();
        assert_eq!(value["version"], "2.1.0");
        let results = value["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[1]["level"], "note");
        let rules = value["runs"][0]["tool"]["driver"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
    }
}
