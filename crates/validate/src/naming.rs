//! Naming convention enforcement: case, length, affixes, and reserved words.

use crate::issue::{Severity, ValidationIssue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A case convention a name must follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NamingCase {
    /// `PascalCase`.
    Pascal,
    /// `camelCase`.
    Camel,
    /// `snake_case`.
    Snake,
    /// `SCREAMING_SNAKE_CASE`.
    ScreamingSnake,
    /// A custom regex the whole name must match.
    Custom {
        /// The pattern, anchored implicitly at both ends.
        pattern: String,
    },
}

impl NamingCase {
    /// Whether `name` conforms to this case convention.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamingCase::Pascal => pascal_case_regex().is_match(name),
            NamingCase::Camel => camel_case_regex().is_match(name),
            NamingCase::Snake => snake_case_regex().is_match(name),
            NamingCase::ScreamingSnake => screaming_snake_case_regex().is_match(name),
            NamingCase::Custom { pattern } => Regex::new(pattern)
                .map(|re| re.is_match(name))
                .unwrap_or(false),
        }
    }

    /// Rewrite `name` into this case convention, on a best-effort basis.
    ///
    /// Splits on existing case boundaries, `_`, `-`, and spaces, then
    /// rejoins in the target convention. Used for the naming rule's
    /// auto-fix.
    pub fn rewrite(&self, name: &str) -> String {
        let words = split_words(name);
        match self {
            NamingCase::Pascal => words
                .iter()
                .map(|w| capitalize(w))
                .collect::<Vec<_>>()
                .join(""),
            NamingCase::Camel => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
                .collect::<Vec<_>>()
                .join(""),
            NamingCase::Snake => words
                .iter()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join("_"),
            NamingCase::ScreamingSnake => words
                .iter()
                .map(|w| w.to_uppercase())
                .collect::<Vec<_>>()
                .join("_"),
            NamingCase::Custom { .. } => name.to_string(),
        }
    }
}

fn pascal_case_regex() -> Regex {
    Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap()
}
fn camel_case_regex() -> Regex {
    Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap()
}
fn snake_case_regex() -> Regex {
    Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").unwrap()
}
fn screaming_snake_case_regex() -> Regex {
    Regex::new(r"^[A-Z][A-Z0-9]*(_[A-Z0-9]+)*$").unwrap()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
        prev_lower = c.is_lowercase();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// A complete naming rule for one entity type: case convention, length
/// bounds, forbidden affixes/words, and a reserved-word set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingRule {
    /// The required case convention.
    pub case: NamingCase,
    /// Minimum name length, inclusive.
    pub min_length: usize,
    /// Maximum name length, inclusive.
    pub max_length: usize,
    /// Prefixes a name must not start with.
    pub forbidden_prefixes: Vec<String>,
    /// Suffixes a name must not end with.
    pub forbidden_suffixes: Vec<String>,
    /// Whole words a name must not equal or contain as a standalone
    /// component (case-insensitive).
    pub forbidden_words: Vec<String>,
    /// Reserved words that cannot be used as names at all.
    pub reserved_words: HashSet<String>,
    /// Whether violations of `case` should be reported with an
    /// auto-fixed suggestion rather than as a bare rejection.
    pub auto_fix: bool,
}

impl NamingRule {
    /// Validate `name` against this rule, returning every issue found.
    pub fn validate(&self, name: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.reserved_words.contains(&name.to_lowercase()) {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "naming.reserved_word",
                format!("'{name}' is a reserved word and cannot be used as a name"),
            ));
        }

        if name.len() < self.min_length {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "naming.too_short",
                format!(
                    "'{name}' is {} chars, shorter than the minimum of {}",
                    name.len(),
                    self.min_length
                ),
            ));
        }
        if name.len() > self.max_length {
            issues.push(ValidationIssue::new(
                Severity::Error,
                "naming.too_long",
                format!(
                    "'{name}' is {} chars, longer than the maximum of {}",
                    name.len(),
                    self.max_length
                ),
            ));
        }

        for prefix in &self.forbidden_prefixes {
            if name.starts_with(prefix.as_str()) {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    "naming.forbidden_prefix",
                    format!("'{name}' starts with forbidden prefix '{prefix}'"),
                ));
            }
        }
        for suffix in &self.forbidden_suffixes {
            if name.ends_with(suffix.as_str()) {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    "naming.forbidden_suffix",
                    format!("'{name}' ends with forbidden suffix '{suffix}'"),
                ));
            }
        }
        let lower = name.to_lowercase();
        for word in &self.forbidden_words {
            if lower.contains(&word.to_lowercase()) {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    "naming.forbidden_word",
                    format!("'{name}' contains forbidden word '{word}'"),
                ));
            }
        }

        if !self.case.matches(name) {
            let mut issue = ValidationIssue::new(
                Severity::Error,
                "naming.case_mismatch",
                format!("'{name}' does not conform to the required naming case"),
            );
            if self.auto_fix {
                let fixed = self.case.rewrite(name);
                issue = issue.with_auto_fix(serde_json::Value::String(fixed));
            }
            issues.push(issue);
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(case: NamingCase, auto_fix: bool) -> NamingRule {
        NamingRule {
            case,
            min_length: 1,
            max_length: 64,
            forbidden_prefixes: vec!["_".to_string()],
            forbidden_suffixes: vec!["Impl".to_string()],
            forbidden_words: vec!["temp".to_string()],
            reserved_words: ["type", "class"].iter().map(|s| s.to_string()).collect(),
            auto_fix,
        }
    }

    #[test]
    fn pascal_case_accepts_and_rejects() {
        let r = rule(NamingCase::Pascal, false);
        assert!(r.validate("Employee").is_empty());
        assert!(!r.validate("employee").is_empty());
    }

    #[test]
    fn case_mismatch_can_carry_auto_fix() {
        let r = rule(NamingCase::Pascal, true);
        let issues = r.validate("employee_record");
        let fix_issue = issues
            .iter()
            .find(|i| i.code == "naming.case_mismatch")
            .unwrap();
        assert_eq!(
            fix_issue.auto_fixed_value,
            Some(serde_json::Value::String("EmployeeRecord".to_string()))
        );
    }

    #[test]
    fn reserved_words_are_rejected() {
        let r = rule(NamingCase::Pascal, false);
        assert!(r
            .validate("Type")
            .iter()
            .any(|i| i.code == "naming.reserved_word"));
    }

    #[test]
    fn forbidden_affixes_and_words_are_rejected() {
        let r = rule(NamingCase::Pascal, false);
        assert!(r
            .validate("_Hidden")
            .iter()
            .any(|i| i.code == "naming.forbidden_prefix"));
        assert!(r
            .validate("WorkerImpl")
            .iter()
            .any(|i| i.code == "naming.forbidden_suffix"));
        assert!(r
            .validate("TempRecord")
            .iter()
            .any(|i| i.code == "naming.forbidden_word"));
    }

    #[test]
    fn snake_and_screaming_snake_case_recognized() {
        assert!(NamingCase::Snake.matches("employee_id"));
        assert!(!NamingCase::Snake.matches("EmployeeId"));
        assert!(NamingCase::ScreamingSnake.matches("MAX_RETRIES"));
        assert!(!NamingCase::ScreamingSnake.matches("max_retries"));
    }
}
