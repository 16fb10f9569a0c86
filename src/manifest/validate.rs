//! Validation entry points for manifest files and directories
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::manifest::bundle::discover_bundle;
use crate::manifest::core::{
    CATALOG_SOURCE_KIND, CRD_KIND, CSV_KIND, CatalogSource, ClusterServiceVersion,
    CustomResourceDefinition, PartialObject, from_document,
};
use crate::manifest::errors::{Error, Result};
use crate::manifest::examples::match_examples;
use crate::manifest::result::{ErrorKind, ManifestResult, ValidationError};
use crate::manifest::schema::{
    StructuralSchemaValidator, inspect_definition, validate_custom_resource,
};
use crate::manifest::validator::{ManifestObject, default_validators, validate_objects};

/// Validate a single manifest file, or every manifest in a package directory
pub fn validate_path(path: &Path) -> Result<Vec<ManifestResult>> {
    if !path.is_dir() {
        return validate_file(path);
    }

    let layout = discover_bundle(path)?;
    let mut results = Vec::new();
    for file in layout.manifest_files() {
        results.extend(validate_file(file)?);
    }
    Ok(results)
}

/// Validate every document of a manifest file
pub fn validate_file(file_path: &Path) -> Result<Vec<ManifestResult>> {
    let content =
        std::fs::read_to_string(file_path).map_err(|err| Error::read(file_path, err))?;
    Ok(validate_documents(&content, &file_path.display().to_string()))
}

/// Validate the YAML or JSON documents in `content`. `source` names results
/// for documents that could not be decoded.
pub fn validate_documents(content: &str, source: &str) -> Vec<ManifestResult> {
    let documents = match split_documents(content) {
        Ok(documents) => documents,
        Err(err) => {
            let mut result = ManifestResult::named(source);
            result.push(ValidationError::parse_error(
                "",
                format!("parsing raw YAML: {err}"),
            ));
            return vec![result];
        }
    };

    let mut results = Vec::new();
    let mut objects = Vec::new();
    for (index, document) in documents.into_iter().enumerate() {
        match decode_object(document) {
            Ok(ManifestObject::Unrecognized { api_version, kind }) => {
                debug!(source, index, %api_version, %kind, "ignoring unrecognized document");
            }
            Ok(object) => objects.push(object),
            Err(error) => {
                warn!(source, index, %error, "document could not be decoded");
                let mut result = ManifestResult::named(format!("{source}#{index}"));
                result.push(error);
                results.push(result);
            }
        }
    }

    results.extend(validate_objects(&mut default_validators(), &objects));
    results
}

/// Splits a multi-document YAML stream; JSON input is a single document.
pub fn split_documents(content: &str) -> std::result::Result<Vec<Value>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Routes a generic document to the typed shape named by its `kind`.
pub fn decode_object(document: Value) -> std::result::Result<ManifestObject, ValidationError> {
    if !document.is_object() {
        return Err(ValidationError::invalid_document(
            "input document is not a valid manifest object",
        ));
    }
    let kind = string_at(&document, "kind");
    let api_version = string_at(&document, "apiVersion");

    match kind.as_str() {
        CSV_KIND => decode::<ClusterServiceVersion>(document, CSV_KIND).map(Into::into),
        CRD_KIND => decode::<CustomResourceDefinition>(document, CRD_KIND).map(Into::into),
        _ => Ok(ManifestObject::Unrecognized { api_version, kind }),
    }
}

/// Decodes `bytes` as the given kind and runs the checks specific to it.
pub fn validate_kind(kind: &str, bytes: &[u8]) -> ManifestResult {
    let document = match serde_yaml::from_slice::<Value>(bytes) {
        Ok(document) => document,
        Err(err) => {
            return ManifestResult::single(ValidationError::parse_error(
                "",
                format!("parsing raw YAML: {err}"),
            ));
        }
    };

    let outcome = match kind {
        CSV_KIND => decode::<ClusterServiceVersion>(document, CSV_KIND).map(|csv| {
            let mut result = match_examples(&csv);
            result.name = csv.name().to_string();
            result
        }),
        CRD_KIND => decode::<CustomResourceDefinition>(document, CRD_KIND).map(|crd| {
            let mut result = inspect_definition(&StructuralSchemaValidator, &crd);
            result.name = crd.name().to_string();
            result
        }),
        CATALOG_SOURCE_KIND => decode::<CatalogSource>(document, CATALOG_SOURCE_KIND)
            .map(|catalog| ManifestResult::named(catalog.name())),
        other => Err(ValidationError::parse_error(
            "kind",
            format!("unrecognized kind: {other}"),
        )),
    };
    outcome.unwrap_or_else(ManifestResult::single)
}

/// Validates a CRD file statically, then checks that the object in
/// `object_bytes` is one of the resources it defines.
pub fn validate_crd_file(schema_path: &Path, object_bytes: &[u8]) -> Result<ManifestResult> {
    let content =
        std::fs::read_to_string(schema_path).map_err(|err| Error::read(schema_path, err))?;

    let crd = match parse_yaml::<CustomResourceDefinition>(content.as_bytes(), CRD_KIND) {
        Ok(crd) => crd,
        Err(error) => return Ok(ManifestResult::single(error)),
    };

    let mut result = inspect_definition(&StructuralSchemaValidator, &crd);
    result.name = crd.name().to_string();
    if result.has_errors() {
        result.push(ValidationError::new(
            ErrorKind::ExternalValidationFailed,
            "",
            format!("CRD failed validation: {}", schema_path.display()),
        ));
        return Ok(result);
    }

    let object = match parse_yaml::<PartialObject>(object_bytes, "object") {
        Ok(object) => object,
        Err(error) => {
            result.push(error);
            return Ok(result);
        }
    };
    for violation in validate_custom_resource(
        &crd,
        &object.type_meta.api_version,
        &object.type_meta.kind,
    ) {
        result.push(violation.into());
    }
    Ok(result)
}

fn parse_yaml<T: DeserializeOwned>(
    bytes: &[u8],
    what: &str,
) -> std::result::Result<T, ValidationError> {
    let document = serde_yaml::from_slice::<Value>(bytes).map_err(|err| {
        ValidationError::parse_error("", format!("parsing raw YAML for {what}: {err}"))
    })?;
    decode(document, what)
}

fn decode<T: DeserializeOwned>(document: Value, what: &str) -> std::result::Result<T, ValidationError> {
    from_document(document)
        .map_err(|err| ValidationError::parse_error("", format!("decoding {what}: {err}")))
}

fn string_at(document: &Value, key: &str) -> String {
    document
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETCD_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: etcdclusters.etcd.database.coreos.com
spec:
  group: etcd.database.coreos.com
  version: v1beta2
  scope: Namespaced
  names:
    plural: etcdclusters
    singular: etcdcluster
    kind: EtcdCluster
    listKind: EtcdClusterList
"#;

    #[test]
    fn splits_yaml_streams_and_skips_empty_documents() {
        let documents = split_documents("a: 1\n---\n---\nb: 2\n").unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[1]["b"], 2);
    }

    #[test]
    fn json_is_a_single_document() {
        let documents = split_documents(r#"{"kind": "ConfigMap", "apiVersion": "v1"}"#).unwrap();
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn decode_routes_by_kind() {
        let documents = split_documents(ETCD_CRD).unwrap();
        let object = decode_object(documents[0].clone()).unwrap();
        assert!(matches!(object, ManifestObject::CustomResourceDefinition(_)));
        assert_eq!(object.name(), "etcdclusters.etcd.database.coreos.com");

        let object = decode_object(serde_json::json!({"apiVersion": "v1", "kind": "Secret"})).unwrap();
        assert_eq!(
            object,
            ManifestObject::Unrecognized {
                api_version: "v1".to_string(),
                kind: "Secret".to_string()
            }
        );
    }

    #[test]
    fn non_mapping_document_is_invalid() {
        let error = decode_object(serde_json::json!(["not", "a", "manifest"])).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidDocument);

        let results = validate_documents("- a\n- b\n", "list.yaml");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "list.yaml#0");
        assert_eq!(results[0].errors[0].kind, ErrorKind::InvalidDocument);
    }

    #[test]
    fn undecodable_typed_document_is_a_parse_error() {
        let results = validate_documents(
            "kind: ClusterServiceVersion\nspec:\n  keywords: 7\n",
            "broken.yaml",
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].errors[0].kind, ErrorKind::ParseError);
    }

    #[test]
    fn malformed_yaml_is_reported_for_the_file() {
        let results = validate_documents("kind: [unterminated", "bad.yaml");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "bad.yaml");
        assert_eq!(results[0].errors[0].kind, ErrorKind::ParseError);
    }

    #[test]
    fn validate_kind_checks_named_kind() {
        let result = validate_kind(CRD_KIND, ETCD_CRD.as_bytes());
        assert!(result.is_clean(), "{result:?}");
        assert_eq!(result.name, "etcdclusters.etcd.database.coreos.com");

        let result = validate_kind("Subscription", b"kind: Subscription\n");
        assert_eq!(result.errors[0].kind, ErrorKind::ParseError);
        assert_eq!(result.errors[0].field_path, "kind");
    }

    #[test]
    fn validate_kind_only_decodes_catalog_sources() {
        let catalog = b"apiVersion: operators.coreos.com/v1alpha1\nkind: CatalogSource\nmetadata:\n  name: community\nspec:\n  sourceType: grpc\n";
        let result = validate_kind(CATALOG_SOURCE_KIND, catalog);
        assert!(result.is_clean(), "{result:?}");
        assert_eq!(result.name, "community");

        let result = validate_kind(
            CATALOG_SOURCE_KIND,
            b"kind: CatalogSource\nspec:\n  secrets: pull-secret\n",
        );
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::ParseError);
        assert!(result.errors[0].message.starts_with("decoding CatalogSource"));
    }

    #[test]
    fn blank_yaml_values_are_inspected_as_missing() {
        let results = validate_documents(
            "apiVersion: operators.coreos.com/v1alpha1\nkind: ClusterServiceVersion\nmetadata:\n  name: op.v1\nspec:\n  displayName:\n  keywords:\n  replaces:\n",
            "csv.yaml",
        );

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.name, "op.v1");
        let errors: Vec<_> = result.errors.iter().map(|e| e.field_path.as_str()).collect();
        assert!(errors.contains(&"Spec.DisplayName"));
        assert!(errors.contains(&"Spec.Keywords"));
        assert!(result.errors.iter().all(|e| e.kind == ErrorKind::MandatoryFieldMissing));
        assert!(result.warnings.iter().any(|w| w.field_path == "Spec.Replaces"));
    }

    #[test]
    fn validate_kind_on_csv_only_matches_examples() {
        let csv = r#"
kind: ClusterServiceVersion
metadata:
  name: widget-operator.v1.0.0
  annotations:
    alm-examples: '[{"apiVersion":"example.com/v2","kind":"Widget"}]'
spec:
  customresourcedefinitions:
    owned:
      - name: widgets.example.com
        version: v1
        kind: Widget
"#;
        let result = validate_kind(CSV_KIND, csv.as_bytes());
        assert_eq!(result.name, "widget-operator.v1.0.0");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::UnmatchedExample);
        assert!(result.warnings.is_empty());
    }
}
