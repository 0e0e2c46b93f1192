use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::EncodingError;
use crate::resolver::ResolveError;
use crate::rules::Finding;

/// Errors surfaced by the validation and resolution pipeline.
///
/// Every variant names the document it concerns so a single `Display` line
/// is actionable. `Validation` is a policy outcome rather than a defect in
/// the input machinery; its `Display` enumerates one finding per line.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: EncodingError,
    },

    #[error("failed to parse YAML at {}: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize resolved document to {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid rule file {}: {detail}", .path.display())]
    RuleFile { path: PathBuf, detail: String },

    #[error("validation failed for {}:\n{}", .path.display(), render_findings(.findings))]
    Validation {
        path: PathBuf,
        findings: Vec<Finding>,
    },

    #[error("failed to resolve references in {}: {source}", .path.display())]
    Resolution {
        path: PathBuf,
        #[source]
        source: ResolveError,
    },
}

/// Result type alias for pipeline operations.
pub type SpecResult<T> = Result<T, SpecError>;

fn render_findings(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|finding| format!("  {finding}"))
        .collect::<Vec<_>>()
        .join("\n")
}
