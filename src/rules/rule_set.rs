use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::encoding;
use crate::error::SpecError;

/// Severity declared by a rule. Ordered from least to most severe so a
/// failure threshold can compare against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hint,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hint => "hint",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hint" => Ok(Self::Hint),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown severity {other:?} (expected error, warning, info, or hint)"
            )),
        }
    }
}

/// One declarative rule: which fact of the document it inspects (`given`),
/// how severe a violation is, and the message reported on violation.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub given: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

/// A named, ordered set of rules under a required top-level `rules` key.
/// Iteration order is file order; rules are evaluated independently.
#[derive(Debug, Deserialize)]
pub struct RuleSet {
    pub rules: IndexMap<String, Rule>,
}

impl RuleSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Loads a rule set from a YAML file.
///
/// A rule missing a required field (`given`, `severity`), an unknown
/// severity, or a file without a `rules` key aborts the whole load; no
/// partial rule sets are ever evaluated.
pub fn load_rule_set(path: &Path) -> Result<RuleSet, SpecError> {
    let raw = fs::read(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = encoding::normalize(&raw).map_err(|source| SpecError::Encoding {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|e| SpecError::RuleFile {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// One reported issue, produced either by structural indexing or by a rule.
#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Severity,
    pub rule: Option<String>,
    pub message: String,
    pub location: Option<String>,
}

impl Finding {
    /// A finding from the structural pass; always error severity.
    pub fn structural(message: impl Into<String>, location: Option<&str>) -> Self {
        Self {
            severity: Severity::Error,
            rule: None,
            message: message.into(),
            location: location.map(str::to_string),
        }
    }

    /// A finding attributed to a named rule.
    pub fn rule(
        name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            severity,
            rule: Some(name.into()),
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "[{}] {}: {}", self.severity, rule, self.message)?,
            None => write!(f, "[{}] {}", self.severity, self.message)?,
        }
        if let Some(location) = &self.location {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}
