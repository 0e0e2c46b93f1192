pub mod document;
pub mod encoding;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod rules;

pub use document::{load_document, parse_document, to_yaml_string, write_document, SpecIndex};
pub use encoding::{normalize, EncodingError};
pub use error::{SpecError, SpecResult};
pub use pipeline::{PipelineConfig, PipelineReport, Stage};
pub use resolver::{index_references, resolve, RefSite, Resolution, ResolveError, ResolverConfig};
pub use rules::{evaluate, load_rule_set, FailureThreshold, Finding, Rule, RuleSet, Selector, Severity};
