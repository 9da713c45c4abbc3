//! Validation issues and severities.

use oms_core::patch::JsonPointer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How serious a validation issue is.
///
/// `Error` blocks the mutation; `Warn` is surfaced to the caller but does
/// not block; `Info` is advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Advisory only.
    Info,
    /// Surfaced to the caller, does not block.
    Warn,
    /// Blocks the mutation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// One finding from a single validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// How serious the finding is.
    pub severity: Severity,
    /// A short, stable code identifying the kind of issue (e.g.
    /// `"naming.case_mismatch"`), for programmatic handling.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// The field or path the issue concerns, if localized.
    pub path: Option<JsonPointer>,
    /// The value the validator would substitute if auto-fix is accepted.
    pub auto_fixed_value: Option<Value>,
}

impl ValidationIssue {
    /// Build an issue with no path or auto-fix.
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            severity,
            code: code.into(),
            message: message.into(),
            path: None,
            auto_fixed_value: None,
        }
    }

    /// Attach a path.
    pub fn with_path(mut self, path: JsonPointer) -> Self {
        self.path = Some(path);
        self
    }

    /// Attach an auto-fixed replacement value.
    pub fn with_auto_fix(mut self, value: Value) -> Self {
        self.auto_fixed_value = Some(value);
        self
    }
}

/// The outcome of running the validator pipeline against a proposed document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every issue raised, across all validators, in pipeline order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Whether any issue at `Error` severity is present — this is the only
    /// severity that blocks a mutation.
    pub fn has_blocking_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// All issues at or above a given severity.
    pub fn issues_at_or_above(&self, min: Severity) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity >= min).collect()
    }

    /// Merge another report's issues into this one.
    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }
}
