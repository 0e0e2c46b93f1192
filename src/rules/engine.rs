use crate::document::SpecIndex;

use super::{Finding, RuleSet, Severity};

/// The closed set of selectors the engine recognizes.
///
/// This is a deliberately minimal dispatch, not a path-query language: each
/// selector names one indexed fact. Anything else parses to `Unknown`,
/// which evaluates to a no-op so richer rule files stay loadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    SecuritySchemes,
    Contact,
    ServerUrls,
    Unknown,
}

impl Selector {
    pub fn parse(given: &str) -> Self {
        match given {
            "$.components.securitySchemes" => Self::SecuritySchemes,
            "$.info.contact" => Self::Contact,
            "$.servers[*].url" => Self::ServerUrls,
            _ => Self::Unknown,
        }
    }
}

/// Evaluates a rule set against the indexed facts of one document.
///
/// The returned order is fixed: structural findings first, then rule
/// findings in rule-file order. A rule that inspects every server URL
/// contributes its findings contiguously, in server-list order.
pub fn evaluate(index: &SpecIndex, rules: &RuleSet) -> Vec<Finding> {
    let mut findings: Vec<Finding> = index.structural_findings().to_vec();

    for (name, rule) in &rules.rules {
        match Selector::parse(&rule.given) {
            Selector::SecuritySchemes => {
                if !index.has_security_schemes() {
                    findings.push(Finding::rule(
                        name.as_str(),
                        rule.severity,
                        rule.description.as_str(),
                        Some("$.components.securitySchemes".to_string()),
                    ));
                }
            }
            Selector::Contact => {
                if !index.has_contact() {
                    findings.push(Finding::rule(
                        name.as_str(),
                        rule.severity,
                        rule.description.as_str(),
                        Some("$.info.contact".to_string()),
                    ));
                }
            }
            Selector::ServerUrls => {
                for (position, url) in index.server_urls().iter().enumerate() {
                    if !url.starts_with("https://") {
                        findings.push(Finding::rule(
                            name.as_str(),
                            rule.severity,
                            rule.description.as_str(),
                            Some(format!("$.servers[{position}].url")),
                        ));
                    }
                }
            }
            Selector::Unknown => {
                tracing::debug!(rule = %name, given = %rule.given, "selector not recognized, skipping");
            }
        }
    }

    findings
}

/// When a non-empty finding list fails the run.
///
/// `AnyFinding` reproduces the long-standing behavior where severity is
/// informational only; `AtLeast` restricts failure to findings at or above
/// a severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureThreshold {
    #[default]
    AnyFinding,
    AtLeast(Severity),
}

impl FailureThreshold {
    pub fn is_failure(&self, findings: &[Finding]) -> bool {
        match self {
            Self::AnyFinding => !findings.is_empty(),
            Self::AtLeast(min) => findings.iter().any(|f| f.severity >= *min),
        }
    }
}
