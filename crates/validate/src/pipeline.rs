//! The pluggable validator pipeline: an ordered sequence of stateless
//! validators run against proposed content.

use crate::issue::ValidationReport;
use serde_json::Value;

/// A single pluggable validator.
///
/// Validators are stateless across calls — any rule set they need (naming
/// rules, semantic constraints, and so on) is supplied by the caller on
/// each invocation, not cached internally.
pub trait Validator: Send + Sync {
    /// A short name identifying this validator, used in tracing spans.
    fn name(&self) -> &'static str;

    /// Run this validator against `content`, returning every issue found.
    fn validate(&self, content: &Value) -> Vec<crate::issue::ValidationIssue>;
}

/// An ordered collection of validators, run in sequence against a single
/// proposed document.
#[derive(Default)]
pub struct ValidationPipeline {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationPipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        ValidationPipeline {
            validators: Vec::new(),
        }
    }

    /// Append a validator to the end of the pipeline.
    pub fn push(&mut self, validator: Box<dyn Validator>) -> &mut Self {
        self.validators.push(validator);
        self
    }

    /// Run every validator against `content`, collecting all issues.
    ///
    /// Validators always all run — an `Error` from an earlier validator
    /// does not short-circuit later ones, since the caller needs the full
    /// issue list to report back in one response.
    pub fn run(&self, content: &Value) -> ValidationReport {
        let mut report = ValidationReport::default();
        for validator in &self.validators {
            let issues = validator.validate(content);
            if !issues.is_empty() {
                tracing::debug!(validator = validator.name(), count = issues.len(), "validator raised issues");
            }
            report.issues.extend(issues);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{Severity, ValidationIssue};

    struct AlwaysWarns;
    impl Validator for AlwaysWarns {
        fn name(&self) -> &'static str {
            "always_warns"
        }
        fn validate(&self, _content: &Value) -> Vec<ValidationIssue> {
            vec![ValidationIssue::new(Severity::Warn, "test.warn", "always warns")]
        }
    }

    struct AlwaysErrors;
    impl Validator for AlwaysErrors {
        fn name(&self) -> &'static str {
            "always_errors"
        }
        fn validate(&self, _content: &Value) -> Vec<ValidationIssue> {
            vec![ValidationIssue::new(Severity::Error, "test.error", "always errors")]
        }
    }

    #[test]
    fn all_validators_run_regardless_of_earlier_severity() {
        let mut pipeline = ValidationPipeline::new();
        pipeline.push(Box::new(AlwaysErrors)).push(Box::new(AlwaysWarns));
        let report = pipeline.run(&serde_json::json!({}));
        assert_eq!(report.issues.len(), 2);
        assert!(report.has_blocking_errors());
    }
}
