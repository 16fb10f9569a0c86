//! Per-manifest validation results.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidDocument,
    MandatoryFieldMissing,
    OptionalFieldMissing,
    ParseError,
    ExamplesMissing,
    UnmatchedExample,
    ExternalValidationFailed,
}

impl ErrorKind {
    /// Warning-severity kinds never make a manifest fail.
    pub fn is_warning(self) -> bool {
        matches!(self, Self::OptionalFieldMissing | Self::ExamplesMissing)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::InvalidDocument => "InvalidDocument",
            Self::MandatoryFieldMissing => "MandatoryFieldMissing",
            Self::OptionalFieldMissing => "OptionalFieldMissing",
            Self::ParseError => "ParseError",
            Self::ExamplesMissing => "ExamplesMissing",
            Self::UnmatchedExample => "UnmatchedExample",
            Self::ExternalValidationFailed => "ExternalValidationFailed",
        };
        write!(f, "{}", key)
    }
}

/// One reported condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    /// Fully qualified dotted path from the document root.
    pub field_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field_path: field_path.into(),
            value: None,
            message: message.into(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDocument, "", message)
    }

    pub fn mandatory_field_missing(field_path: &str, type_name: &str) -> Self {
        Self::new(
            ErrorKind::MandatoryFieldMissing,
            field_path,
            format!("mandatory {type_name} missing: ({field_path})"),
        )
    }

    pub fn optional_field_missing(field_path: &str, type_name: &str) -> Self {
        Self::new(
            ErrorKind::OptionalFieldMissing,
            field_path,
            format!("optional {type_name} missing: ({field_path})"),
        )
    }

    pub fn parse_error(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, field_path, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field_path.is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.field_path, self.message)
        }
    }
}

/// Findings for a single manifest.
///
/// Entries are routed into `errors` or `warnings` by their kind when they are
/// pushed, so the two lists never share an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestResult {
    pub name: String,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ManifestResult {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Result holding exactly one finding.
    pub fn single(error: ValidationError) -> Self {
        let mut result = Self::default();
        result.push(error);
        result
    }

    pub fn push(&mut self, error: ValidationError) {
        if error.kind.is_warning() {
            self.warnings.push(error);
        } else {
            self.errors.push(error);
        }
    }

    /// Appends the findings of `other`, keeping this result's name unless it
    /// is blank.
    pub fn merge(&mut self, other: ManifestResult) {
        if self.name.is_empty() {
            self.name = other.name;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// True when any result in the batch carries at least one error.
pub fn any_errors(results: &[ManifestResult]) -> bool {
    results.iter().any(ManifestResult::has_errors)
}
