use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::{load_document, write_document, SpecIndex};
use crate::error::SpecError;
use crate::resolver::{self, ResolverConfig};
use crate::rules::{evaluate, load_rule_set, FailureThreshold, RuleSet};

/// Default output name for the resolved old revision.
pub const OLD_OUTPUT_NAME: &str = "oldSwaggerResolve.yaml";
/// Default output name for the resolved new revision.
pub const NEW_OUTPUT_NAME: &str = "swaggerResolve.yaml";

/// The pipeline's stages, in execution order. Each stage must fully
/// succeed before the next one starts; any failure short-circuits the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateOld,
    ValidateNew,
    ResolveOld,
    ResolveNew,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidateOld => "validate-old",
            Self::ValidateNew => "validate-new",
            Self::ResolveOld => "resolve-old",
            Self::ResolveNew => "resolve-new",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// Rule file for the validation stages; `None` runs the resolve-only
    /// pipeline, which never consults rules or the index.
    pub rules_path: Option<PathBuf>,
    /// Directory the two resolved documents are written into.
    pub out_dir: PathBuf,
    pub fail_threshold: FailureThreshold,
    pub allow_file_refs: bool,
}

impl PipelineConfig {
    pub fn new(old_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            rules_path: None,
            out_dir: PathBuf::from("."),
            fail_threshold: FailureThreshold::default(),
            allow_file_refs: false,
        }
    }

    pub fn old_output(&self) -> PathBuf {
        self.out_dir.join(OLD_OUTPUT_NAME)
    }

    pub fn new_output(&self) -> PathBuf {
        self.out_dir.join(NEW_OUTPUT_NAME)
    }
}

/// What a completed run produced.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Findings per validated document that stayed below the failure
    /// threshold (old, then new). Empty when validation was skipped.
    pub findings_below_threshold: Vec<usize>,
    /// Cyclic reference pointers left unexpanded, per document.
    pub old_cycles: Vec<String>,
    pub new_cycles: Vec<String>,
    /// The resolved documents written, in write order.
    pub outputs: Vec<PathBuf>,
}

/// Runs the pipeline: validate the old document, validate the new one,
/// then resolve and write each. Strictly fail-fast, left to right — if the
/// old document does not validate, the new one is never even loaded, and
/// nothing is written.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport, SpecError> {
    let mut report = PipelineReport::default();

    let rules = config
        .rules_path
        .as_deref()
        .map(load_rule_set)
        .transpose()?;

    if let Some(rules) = &rules {
        report
            .findings_below_threshold
            .push(validate(Stage::ValidateOld, &config.old_path, rules, config)?);
        report
            .findings_below_threshold
            .push(validate(Stage::ValidateNew, &config.new_path, rules, config)?);
    }

    report.old_cycles = resolve_to_file(
        Stage::ResolveOld,
        &config.old_path,
        &config.old_output(),
        config,
    )?;
    report.outputs.push(config.old_output());

    report.new_cycles = resolve_to_file(
        Stage::ResolveNew,
        &config.new_path,
        &config.new_output(),
        config,
    )?;
    report.outputs.push(config.new_output());

    Ok(report)
}

fn validate(
    stage: Stage,
    path: &Path,
    rules: &RuleSet,
    config: &PipelineConfig,
) -> Result<usize, SpecError> {
    info!(stage = stage.as_str(), path = %path.display(), "validating document");
    let document = load_document(path)?;
    let index = SpecIndex::build(&document);
    let findings = evaluate(&index, rules);
    if config.fail_threshold.is_failure(&findings) {
        return Err(SpecError::Validation {
            path: path.to_path_buf(),
            findings,
        });
    }
    for finding in &findings {
        tracing::warn!(stage = stage.as_str(), %finding, "finding below failure threshold");
    }
    Ok(findings.len())
}

fn resolve_to_file(
    stage: Stage,
    path: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<Vec<String>, SpecError> {
    let document = load_document(path)?;
    let sites = resolver::index_references(&document);
    info!(
        stage = stage.as_str(),
        path = %path.display(),
        references = sites.len(),
        "resolving references"
    );

    let resolver_config = ResolverConfig {
        allow_file_refs: config.allow_file_refs,
        base_dir: path.parent().map(Path::to_path_buf),
    };
    let resolution =
        resolver::resolve(document, &resolver_config).map_err(|source| SpecError::Resolution {
            path: path.to_path_buf(),
            source,
        })?;
    for cycle in &resolution.cycles {
        tracing::warn!(stage = stage.as_str(), %cycle, "cyclic reference left unexpanded");
    }

    write_document(output, &resolution.document)?;
    info!(stage = stage.as_str(), output = %output.display(), "resolved document written");
    Ok(resolution.cycles)
}
