// SPDX-License-Identifier: MIT OR Apache-2.0
//! Field-level issues reported by the profile input/result validator.

use std::fmt;

/// The kind of validation failure, independent of which field it occurred on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssueKind {
    /// A required field was absent.
    Missing,
    /// A field's value did not match its declared type.
    WrongType,
    /// A field's value matched its type but violated an additional
    /// constraint (enum membership, pattern, range).
    ConstraintViolation,
    /// A field was present but not declared by the schema.
    Unexpected,
}

impl fmt::Display for ValidationIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationIssueKind::Missing => "missing",
            ValidationIssueKind::WrongType => "wrong-type",
            ValidationIssueKind::ConstraintViolation => "constraint-violation",
            ValidationIssueKind::Unexpected => "unexpected",
        };
        write!(f, "{s}")
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// What kind of failure this is.
    pub kind: ValidationIssueKind,
    /// Dotted path to the offending field (e.g. `"input.userId"`).
    pub path: String,
    /// What the schema expected, if applicable (e.g. `"string"`).
    pub expected: Option<String>,
    /// What was actually found, if applicable (e.g. `"number"`).
    pub actual: Option<String>,
}

impl ValidationIssue {
    /// A field is missing entirely.
    #[must_use]
    pub fn missing(path: impl Into<String>) -> Self {
        ValidationIssue {
            kind: ValidationIssueKind::Missing,
            path: path.into(),
            expected: None,
            actual: None,
        }
    }

    /// A field has the wrong type.
    #[must_use]
    pub fn wrong_type(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            kind: ValidationIssueKind::WrongType,
            path: path.into(),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}'", self.kind, self.path)?;
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected {expected}, got {actual})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_issue_has_no_type_info() {
        let issue = ValidationIssue::missing("input.userId");
        assert_eq!(issue.to_string(), "missing at 'input.userId'");
    }

    #[test]
    fn wrong_type_issue_includes_expected_and_actual() {
        let issue = ValidationIssue::wrong_type("input.age", "number", "string");
        assert_eq!(
            issue.to_string(),
            "wrong-type at 'input.age' (expected number, got string)"
        );
    }
}
