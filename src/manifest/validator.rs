//! Validators run a family of checks over the manifests they were given.

use tracing::debug;

use crate::manifest::core::{ClusterServiceVersion, CustomResourceDefinition};
use crate::manifest::examples::match_examples;
use crate::manifest::inspect::inspect_into;
use crate::manifest::result::ManifestResult;
use crate::manifest::schema::{SchemaValidator, StructuralSchemaValidator, inspect_definition};

/// A decoded manifest of one of the recognized shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestObject {
    ClusterServiceVersion(Box<ClusterServiceVersion>),
    CustomResourceDefinition(Box<CustomResourceDefinition>),
    /// Any other shape. Validators ignore these.
    Unrecognized { api_version: String, kind: String },
}

impl ManifestObject {
    pub fn name(&self) -> &str {
        match self {
            Self::ClusterServiceVersion(csv) => csv.name(),
            Self::CustomResourceDefinition(crd) => crd.name(),
            Self::Unrecognized { .. } => "",
        }
    }
}

impl From<ClusterServiceVersion> for ManifestObject {
    fn from(csv: ClusterServiceVersion) -> Self {
        Self::ClusterServiceVersion(Box::new(csv))
    }
}

impl From<CustomResourceDefinition> for ManifestObject {
    fn from(crd: CustomResourceDefinition) -> Self {
        Self::CustomResourceDefinition(Box::new(crd))
    }
}

pub trait Validator {
    /// Keeps the objects this validator understands and ignores the rest.
    fn add_objects(&mut self, objects: &[ManifestObject]);

    /// One result per accepted object, in the order they were added.
    fn validate(&self) -> Vec<ManifestResult>;

    fn name(&self) -> &'static str;
}

/// Field presence and example annotations of cluster service versions.
#[derive(Debug, Clone, Default)]
pub struct CsvValidator {
    csvs: Vec<ClusterServiceVersion>,
}

impl CsvValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Validator for CsvValidator {
    fn add_objects(&mut self, objects: &[ManifestObject]) {
        for object in objects {
            if let ManifestObject::ClusterServiceVersion(csv) = object {
                debug!(validator = self.name(), manifest = csv.name(), "accepted object");
                self.csvs.push(csv.as_ref().clone());
            }
        }
    }

    fn validate(&self) -> Vec<ManifestResult> {
        self.csvs
            .iter()
            .map(|csv| {
                let mut result = inspect_csv(csv);
                if result.name.is_empty() {
                    result.name = csv.name().to_string();
                }
                result
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "ClusterServiceVersion Validator"
    }
}

/// Example matching followed by the field presence walk.
pub fn inspect_csv(csv: &ClusterServiceVersion) -> ManifestResult {
    let mut result = match_examples(csv);
    inspect_into(csv, &mut result);
    debug!(
        manifest = csv.name(),
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "inspected cluster service version"
    );
    result
}

/// Static checks of custom resource definitions, delegated to a
/// [`SchemaValidator`].
#[derive(Debug, Clone, Default)]
pub struct CrdValidator<S = StructuralSchemaValidator> {
    crds: Vec<CustomResourceDefinition>,
    schema: S,
}

impl CrdValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SchemaValidator> CrdValidator<S> {
    pub fn with_schema(schema: S) -> Self {
        Self {
            crds: Vec::new(),
            schema,
        }
    }
}

impl<S: SchemaValidator> Validator for CrdValidator<S> {
    fn add_objects(&mut self, objects: &[ManifestObject]) {
        for object in objects {
            if let ManifestObject::CustomResourceDefinition(crd) = object {
                debug!(validator = self.name(), manifest = crd.name(), "accepted object");
                self.crds.push(crd.as_ref().clone());
            }
        }
    }

    fn validate(&self) -> Vec<ManifestResult> {
        self.crds
            .iter()
            .map(|crd| {
                let mut result = inspect_definition(&self.schema, crd);
                if result.name.is_empty() {
                    result.name = crd.name().to_string();
                }
                result
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "CustomResourceDefinition Validator"
    }
}

/// The validators applied to every batch by default.
pub fn default_validators() -> Vec<Box<dyn Validator>> {
    vec![Box::new(CsvValidator::new()), Box::new(CrdValidator::new())]
}

/// Feeds `objects` to each validator and concatenates their results,
/// validator by validator.
pub fn validate_objects(
    validators: &mut [Box<dyn Validator>],
    objects: &[ManifestObject],
) -> Vec<ManifestResult> {
    let mut results = Vec::new();
    for validator in validators.iter_mut() {
        validator.add_objects(objects);
        let batch = validator.validate();
        debug!(validator = validator.name(), results = batch.len(), "validated objects");
        results.extend(batch);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::result::ErrorKind;
    use crate::manifest::schema::SchemaViolation;

    fn named_csv(name: &str) -> ClusterServiceVersion {
        let mut csv = ClusterServiceVersion::default();
        csv.metadata.name = name.to_string();
        csv
    }

    fn named_crd(name: &str) -> CustomResourceDefinition {
        let mut crd = CustomResourceDefinition::default();
        crd.metadata.name = name.to_string();
        crd
    }

    struct RejectAll;

    impl SchemaValidator for RejectAll {
        fn validate_definition(&self, _crd: &CustomResourceDefinition) -> Vec<SchemaViolation> {
            vec![SchemaViolation::new("spec", "rejected")]
        }
    }

    #[test]
    fn csv_validator_ignores_other_shapes() {
        let mut validator = CsvValidator::new();
        validator.add_objects(&[
            named_crd("widgets.example.com").into(),
            ManifestObject::Unrecognized {
                api_version: "v1".to_string(),
                kind: "ConfigMap".to_string(),
            },
            named_csv("widget-operator.v1.0.0").into(),
        ]);

        let results = validator.validate();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "widget-operator.v1.0.0");
    }

    #[test]
    fn csv_results_follow_input_order() {
        let mut validator = CsvValidator::new();
        validator.add_objects(&[named_csv("a").into(), named_csv("b").into()]);
        validator.add_objects(&[named_csv("c").into()]);

        let names: Vec<_> = validator.validate().into_iter().map(|r| r.name).collect();

        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn empty_csv_reports_examples_and_mandatory_fields() {
        let result = inspect_csv(&named_csv("bare"));

        assert_eq!(result.warnings[0].kind, ErrorKind::ExamplesMissing);
        let errors: Vec<_> = result.errors.iter().map(|e| e.field_path.as_str()).collect();
        assert_eq!(errors, ["TypeMeta", "Spec"]);
    }

    #[test]
    fn crd_validator_uses_its_schema() {
        let mut validator = CrdValidator::with_schema(RejectAll);
        validator.add_objects(&[named_crd("widgets.example.com").into(), named_csv("x").into()]);

        let results = validator.validate();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "widgets.example.com");
        assert_eq!(results[0].errors[0].kind, ErrorKind::ExternalValidationFailed);
    }

    #[test]
    fn default_validators_cover_both_shapes() {
        let mut validators = default_validators();
        let results = validate_objects(
            &mut validators,
            &[named_csv("op.v1").into(), named_crd("bad").into()],
        );

        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["op.v1", "bad"]);
        assert!(results.iter().all(ManifestResult::has_errors));
    }
}
