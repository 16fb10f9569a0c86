//! Cross-checks the example objects embedded in a CSV's annotations against
//! the APIs the CSV declares it owns.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::manifest::core::{ClusterServiceVersion, from_document};
use crate::manifest::identity::{IdentitySet, ResourceIdentity, display_set};
use crate::manifest::result::{ErrorKind, ManifestResult, ValidationError};

pub const EXAMPLES_ANNOTATION: &str = "alm-examples";
pub const LEGACY_EXAMPLES_ANNOTATION: &str = "olm.examples";

/// Lookup order; the first key present wins.
pub const EXAMPLES_ANNOTATIONS: [&str; 2] = [EXAMPLES_ANNOTATION, LEGACY_EXAMPLES_ANNOTATION];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExampleObject {
    api_version: String,
    kind: String,
}

pub fn match_examples(csv: &ClusterServiceVersion) -> ManifestResult {
    let mut result = ManifestResult::default();
    let annotations = &csv.metadata.annotations;

    if annotations.is_empty() {
        result.push(examples_missing(csv, "example annotations not found"));
        return result;
    }

    let Some((key, payload)) = EXAMPLES_ANNOTATIONS
        .iter()
        .find_map(|key| annotations.get(*key).map(|value| (*key, value)))
    else {
        result.push(examples_missing(csv, "example annotations not found"));
        return result;
    };
    if payload.is_empty() {
        result.push(examples_missing(csv, &format!("example annotation {key} is empty")));
        return result;
    }

    let annotation_path = format!("ObjectMeta.Annotations.{key}");
    let decoded = serde_json::from_str::<Value>(payload)
        .and_then(from_document::<Option<Vec<ExampleObject>>>);
    let examples = match decoded {
        Ok(examples) => examples.unwrap_or_default(),
        Err(err) => {
            result.push(
                ValidationError::parse_error(
                    annotation_path,
                    format!("parsing example annotations: {err}"),
                )
                .with_value(payload.as_str()),
            );
            return result;
        }
    };

    let owned = owned_apis(csv, &mut result);
    let exemplified = example_apis(&examples, &annotation_path, &mut result);
    if result.has_errors() {
        debug!(
            manifest = csv.name(),
            errors = result.errors.len(),
            "identity sets incomplete, skipping example matching"
        );
        return result;
    }

    for identity in exemplified.difference(&owned) {
        let value = json!({
            "group": identity.group,
            "version": identity.version,
            "kind": identity.kind,
        });
        result.push(
            ValidationError::new(
                ErrorKind::UnmatchedExample,
                annotation_path.as_str(),
                format!(
                    "couldn't match {identity} in provided APIs list: {}",
                    display_set(&owned)
                ),
            )
            .with_value(value),
        );
    }
    debug!(
        manifest = csv.name(),
        owned = owned.len(),
        examples = exemplified.len(),
        unmatched = result.errors.len(),
        "matched example annotations"
    );
    result
}

/// Identities of every owned CRD and API service. Malformed CRD names are
/// recorded in `result` and skipped.
pub fn owned_apis(csv: &ClusterServiceVersion, result: &mut ManifestResult) -> IdentitySet {
    let mut owned = IdentitySet::new();

    for (index, crd) in csv.spec.custom_resource_definitions.owned.iter().enumerate() {
        match ResourceIdentity::from_owned_declaration(&crd.name, &crd.version, &crd.kind) {
            Ok(identity) => {
                owned.insert(identity);
            }
            Err(err) => result.push(err.into_validation_error(format!(
                "Spec.CustomResourceDefinitions.Owned[{index}].Name"
            ))),
        }
    }

    for api in &csv.spec.api_service_definitions.owned {
        owned.insert(api.identity());
    }

    owned
}

fn example_apis(
    examples: &[ExampleObject],
    annotation_path: &str,
    result: &mut ManifestResult,
) -> IdentitySet {
    let mut parsed = IdentitySet::new();
    for (index, example) in examples.iter().enumerate() {
        match ResourceIdentity::from_example_declaration(&example.api_version, &example.kind) {
            Ok(identity) => {
                parsed.insert(identity);
            }
            Err(err) => {
                result.push(err.into_validation_error(format!("{annotation_path}[{index}]")))
            }
        }
    }
    parsed
}

fn examples_missing(csv: &ClusterServiceVersion, message: &str) -> ValidationError {
    ValidationError::new(
        ErrorKind::ExamplesMissing,
        "ObjectMeta.Annotations",
        format!("{message} for {}", csv.name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::core::{ApiServiceDescription, CrdDescription};

    fn csv_owning(owned: &[(&str, &str, &str)]) -> ClusterServiceVersion {
        let mut csv = ClusterServiceVersion::default();
        csv.metadata.name = "widget-operator.v1.0.0".to_string();
        csv.spec.custom_resource_definitions.owned = owned
            .iter()
            .map(|(name, version, kind)| {
                CrdDescription::builder()
                    .name(*name)
                    .version(*version)
                    .kind(*kind)
                    .build()
                    .unwrap()
            })
            .collect();
        csv
    }

    fn with_examples(mut csv: ClusterServiceVersion, key: &str, payload: &str) -> ClusterServiceVersion {
        csv.metadata
            .annotations
            .insert(key.to_string(), payload.to_string());
        csv
    }

    #[test]
    fn matching_example_reports_nothing() {
        let csv = with_examples(
            csv_owning(&[("widgets.example.com", "v1", "Widget")]),
            EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"example.com/v1","kind":"Widget","spec":{"size":3}}]"#,
        );
        assert!(match_examples(&csv).is_clean());
    }

    #[test]
    fn version_mismatch_is_unmatched() {
        let csv = with_examples(
            csv_owning(&[("widgets.example.com", "v1", "Widget")]),
            EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"example.com/v2","kind":"Widget"}]"#,
        );

        let result = match_examples(&csv);

        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert_eq!(error.kind, ErrorKind::UnmatchedExample);
        assert_eq!(
            error.value,
            Some(serde_json::json!({"group": "example.com", "version": "v2", "kind": "Widget"}))
        );
        assert!(error.message.contains("example.com/v2, Kind=Widget"));
        assert!(error.message.contains("example.com/v1, Kind=Widget"));
    }

    #[test]
    fn missing_annotations_warn_once() {
        let result = match_examples(&csv_owning(&[("widgets.example.com", "v1", "Widget")]));
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, ErrorKind::ExamplesMissing);
    }

    #[test]
    fn unrelated_annotations_warn() {
        let csv = with_examples(
            csv_owning(&[]),
            "capabilities",
            "Basic Install",
        );
        let result = match_examples(&csv);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn empty_primary_annotation_shadows_legacy() {
        let csv = with_examples(
            with_examples(
                csv_owning(&[("widgets.example.com", "v1", "Widget")]),
                LEGACY_EXAMPLES_ANNOTATION,
                r#"[{"apiVersion":"example.com/v2","kind":"Widget"}]"#,
            ),
            EXAMPLES_ANNOTATION,
            "",
        );
        let result = match_examples(&csv);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings[0].kind, ErrorKind::ExamplesMissing);
    }

    #[test]
    fn primary_annotation_wins() {
        let csv = with_examples(
            with_examples(
                csv_owning(&[("widgets.example.com", "v1", "Widget")]),
                LEGACY_EXAMPLES_ANNOTATION,
                r#"[{"apiVersion":"example.com/v2","kind":"Widget"}]"#,
            ),
            EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"example.com/v1","kind":"Widget"}]"#,
        );
        assert!(match_examples(&csv).is_clean());
    }

    #[test]
    fn legacy_annotation_is_used_alone() {
        let csv = with_examples(
            csv_owning(&[("widgets.example.com", "v1", "Widget")]),
            LEGACY_EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"example.com/v3","kind":"Widget"}]"#,
        );
        let result = match_examples(&csv);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field_path, "ObjectMeta.Annotations.olm.examples");
    }

    #[test]
    fn malformed_payload_stops_with_parse_error() {
        let csv = with_examples(
            csv_owning(&[("widgets", "v1", "Widget")]),
            EXAMPLES_ANNOTATION,
            "[{not json",
        );
        let result = match_examples(&csv);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::ParseError);
        assert_eq!(result.errors[0].value, Some(serde_json::json!("[{not json")));
    }

    #[test]
    fn malformed_owned_name_suppresses_matching() {
        let csv = with_examples(
            csv_owning(&[("widgets", "v1", "Widget"), ("gadgets.example.com", "v1", "Gadget")]),
            EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"example.com/v9","kind":"Widget"}]"#,
        );

        let result = match_examples(&csv);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::ParseError);
        assert_eq!(
            result.errors[0].field_path,
            "Spec.CustomResourceDefinitions.Owned[0].Name"
        );
    }

    #[test]
    fn every_malformed_example_is_reported() {
        let csv = with_examples(
            csv_owning(&[("widgets.example.com", "v1", "Widget")]),
            EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"v1","kind":"ConfigMap"},{"kind":"Widget"},{"apiVersion":"example.com/v2","kind":"Widget"}]"#,
        );

        let result = match_examples(&csv);

        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.kind == ErrorKind::ParseError));
        assert_eq!(result.errors[1].field_path, "ObjectMeta.Annotations.alm-examples[1]");
    }

    #[test]
    fn null_api_version_fails_only_its_entry() {
        let csv = with_examples(
            csv_owning(&[("widgets.example.com", "v1", "Widget")]),
            EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"example.com/v1","kind":"Widget"},{"apiVersion":null,"kind":"Widget"}]"#,
        );

        let result = match_examples(&csv);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::ParseError);
        assert_eq!(result.errors[0].field_path, "ObjectMeta.Annotations.alm-examples[1]");
    }

    #[test]
    fn owned_but_unexemplified_apis_are_fine() {
        let mut csv = with_examples(
            csv_owning(&[("widgets.example.com", "v1", "Widget")]),
            EXAMPLES_ANNOTATION,
            r#"[{"apiVersion":"metrics.example.com/v1","kind":"Sample"}]"#,
        );
        csv.spec.api_service_definitions.owned = vec![
            ApiServiceDescription::builder()
                .group("metrics.example.com")
                .version("v1")
                .kind("Sample")
                .build()
                .unwrap(),
        ];
        assert!(match_examples(&csv).is_clean());
    }

    #[test]
    fn null_payload_has_no_examples() {
        let csv = with_examples(csv_owning(&[]), EXAMPLES_ANNOTATION, "null");
        assert!(match_examples(&csv).is_clean());
    }
}
