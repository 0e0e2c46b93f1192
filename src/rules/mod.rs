pub mod engine;
pub mod rule_set;

pub use engine::{evaluate, FailureThreshold, Selector};
pub use rule_set::{load_rule_set, Finding, Rule, RuleSet, Severity};
