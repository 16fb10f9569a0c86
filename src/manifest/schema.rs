//! Adapter around the structural CRD checks.
//!
//! The rules themselves are `garde` attributes on the CRD types in
//! [`core`](crate::manifest::core); this module runs them and reshapes what
//! they report into [`ValidationError`]s.

use garde::Validate;
use serde_json::Value;

use crate::manifest::core::CustomResourceDefinition;
use crate::manifest::identity::ResourceIdentity;
use crate::manifest::result::{ErrorKind, ManifestResult, ValidationError};

/// One violation reported by a schema validator.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    pub field: String,
    pub bad_value: Option<Value>,
    pub detail: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn with_bad_value(mut self, value: impl Into<Value>) -> Self {
        self.bad_value = Some(value.into());
        self
    }
}

impl From<SchemaViolation> for ValidationError {
    fn from(violation: SchemaViolation) -> Self {
        ValidationError {
            kind: ErrorKind::ExternalValidationFailed,
            field_path: violation.field,
            value: violation.bad_value,
            message: violation.detail,
        }
    }
}

pub trait SchemaValidator {
    fn validate_definition(&self, crd: &CustomResourceDefinition) -> Vec<SchemaViolation>;
}

/// Static definition checks: per-field `garde` rules plus the rules that
/// relate several fields to each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSchemaValidator;

impl SchemaValidator for StructuralSchemaValidator {
    fn validate_definition(&self, crd: &CustomResourceDefinition) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        if let Err(report) = crd.validate() {
            for (path, error) in report.iter() {
                violations.push(SchemaViolation::new(path.to_string(), error.to_string()));
            }
        }

        let spec = &crd.spec;
        let expected = format!("{}.{}", spec.names.plural, spec.group);
        if crd.metadata.name != expected {
            violations.push(
                SchemaViolation::new(
                    "metadata.name",
                    format!("must be spec.names.plural+\".\"+spec.group ({expected})"),
                )
                .with_bad_value(crd.metadata.name.as_str()),
            );
        }

        if spec.version.is_empty() && spec.versions.is_empty() {
            violations.push(SchemaViolation::new("spec.versions", "must have at least one version"));
        }
        if !spec.version.is_empty()
            && !spec.versions.is_empty()
            && spec.versions[0].name != spec.version
        {
            violations.push(
                SchemaViolation::new("spec.version", "must match the first version in spec.versions")
                    .with_bad_value(spec.version.as_str()),
            );
        }

        violations
    }
}

/// Runs `schema` over one definition and collects the adapted errors.
pub fn inspect_definition(
    schema: &dyn SchemaValidator,
    crd: &CustomResourceDefinition,
) -> ManifestResult {
    let mut result = ManifestResult::default();
    for violation in schema.validate_definition(crd) {
        result.push(violation.into());
    }
    result
}

/// Checks that an object's `apiVersion` and `kind` are served by `crd`.
pub fn validate_custom_resource(
    crd: &CustomResourceDefinition,
    api_version: &str,
    kind: &str,
) -> Vec<SchemaViolation> {
    let identity = match ResourceIdentity::from_example_declaration(api_version, kind) {
        Ok(identity) => identity,
        Err(err) => {
            return vec![SchemaViolation::new("apiVersion", err.to_string()).with_bad_value(api_version)];
        }
    };

    let mut violations = Vec::new();
    if identity.group != crd.spec.group {
        violations.push(
            SchemaViolation::new("apiVersion", format!("group must be {}", crd.spec.group))
                .with_bad_value(api_version),
        );
    }
    let served = crd.served_versions();
    if !served.contains(&identity.version.as_str()) {
        violations.push(
            SchemaViolation::new(
                "apiVersion",
                format!("version is not served, expected one of [{}]", served.join(", ")),
            )
            .with_bad_value(api_version),
        );
    }
    if identity.kind != crd.spec.names.kind {
        violations.push(
            SchemaViolation::new("kind", format!("must be {}", crd.spec.names.kind))
                .with_bad_value(kind),
        );
    }
    violations
}
