use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use garde::Validate;
use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::manifest::identity::ResourceIdentity;
use crate::manifest::inspect::{Field, FieldValue, Inspect};

pub const CSV_KIND: &str = "ClusterServiceVersion";
pub const CRD_KIND: &str = "CustomResourceDefinition";
pub const CATALOG_SOURCE_KIND: &str = "CatalogSource";

/// Decodes a generic document into a typed manifest. Members set to `null`
/// decode to the field's default, the same as absent keys.
pub fn from_document<T: DeserializeOwned>(mut document: Value) -> serde_json::Result<T> {
    drop_null_members(&mut document);
    serde_json::from_value(document)
}

/// Removes every object member whose value is `null`, at any depth.
pub fn drop_null_members(value: &mut Value) {
    match value {
        Value::Object(members) => {
            members.retain(|_, member| !member.is_null());
            members.values_mut().for_each(drop_null_members);
        }
        Value::Array(items) => items.iter_mut().for_each(drop_null_members),
        _ => {}
    }
}

fn timestamp(value: &Option<DateTime<Utc>>) -> FieldValue<'_> {
    FieldValue::Timestamp(value.is_some())
}

/// JSON kept as text. Absent values and the literal `null` are both empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawJson(String);

impl RawJson {
    pub fn new(value: &Value) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.0)
    }
}

impl Serialize for RawJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            return serializer.serialize_none();
        }
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::new(&value))
    }
}

impl<'a> From<&'a RawJson> for FieldValue<'a> {
    fn from(value: &'a RawJson) -> Self {
        FieldValue::RawJson(value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

impl Inspect for TypeMeta {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("Kind", &self.kind),
            Field::optional("APIVersion", &self.api_version),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub generate_name: String,
    pub namespace: String,
    pub uid: String,
    pub resource_version: String,
    pub generation: i64,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl Inspect for ObjectMeta {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("Name", &self.name),
            Field::optional("GenerateName", &self.generate_name),
            Field::optional("Namespace", &self.namespace),
            Field::optional("UID", &self.uid),
            Field::optional("ResourceVersion", &self.resource_version),
            Field::optional("Generation", &self.generation),
            Field::optional("CreationTimestamp", timestamp(&self.creation_timestamp)),
            Field::optional("Labels", &self.labels),
            Field::optional("Annotations", &self.annotations),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterServiceVersion {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: ClusterServiceVersionSpec,
    pub status: ClusterServiceVersionStatus,
}

impl ClusterServiceVersion {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl Inspect for ClusterServiceVersion {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::required("TypeMeta", FieldValue::Record(&self.type_meta)),
            Field::optional("ObjectMeta", FieldValue::Record(&self.metadata)),
            Field::required("Spec", FieldValue::Record(&self.spec)),
            Field::required("Status", FieldValue::Record(&self.status)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterServiceVersionSpec {
    #[serde(rename = "install")]
    pub install_strategy: NamedInstallStrategy,
    pub version: OperatorVersion,
    pub maturity: String,
    #[serde(rename = "customresourcedefinitions")]
    pub custom_resource_definitions: CustomResourceDefinitions,
    #[serde(rename = "apiservicedefinitions")]
    pub api_service_definitions: ApiServiceDefinitions,
    #[serde(rename = "nativeAPIs")]
    pub native_apis: Vec<ResourceIdentity>,
    pub min_kube_version: String,
    pub display_name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub maintainers: Vec<Maintainer>,
    pub provider: AppLink,
    pub links: Vec<AppLink>,
    pub icon: Vec<Icon>,
    pub install_modes: Vec<InstallMode>,
    pub replaces: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub selector: Option<LabelSelector>,
}

impl Inspect for ClusterServiceVersionSpec {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::required("InstallStrategy", FieldValue::Record(&self.install_strategy)),
            Field::optional("Version", FieldValue::Record(&self.version)),
            Field::optional("Maturity", &self.maturity),
            Field::optional(
                "CustomResourceDefinitions",
                FieldValue::Record(&self.custom_resource_definitions),
            ),
            Field::optional(
                "APIServiceDefinitions",
                FieldValue::Record(&self.api_service_definitions),
            ),
            Field::optional("NativeAPIs", &self.native_apis),
            Field::optional("MinKubeVersion", &self.min_kube_version),
            Field::required("DisplayName", &self.display_name),
            Field::optional("Description", &self.description),
            Field::required("Keywords", &self.keywords),
            Field::required("Maintainers", &self.maintainers),
            Field::required("Provider", FieldValue::Record(&self.provider)),
            Field::optional("Links", &self.links),
            Field::required("Icon", &self.icon),
            Field::optional("InstallModes", &self.install_modes),
            Field::optional("Replaces", &self.replaces),
            Field::optional("Labels", &self.labels),
            Field::optional("Annotations", &self.annotations),
            Field::optional("Selector", &self.selector),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedInstallStrategy {
    #[serde(rename = "strategy")]
    pub strategy_name: String,
    #[serde(rename = "spec", skip_serializing_if = "RawJson::is_empty")]
    pub strategy_spec_raw: RawJson,
}

impl Inspect for NamedInstallStrategy {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::required("StrategyName", &self.strategy_name),
            Field::optional("StrategySpecRaw", &self.strategy_spec_raw),
        ]
    }
}

/// Semantic version of the operator, serialized as `MAJOR.MINOR.PATCH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorVersion(pub semver::Version);

impl Default for OperatorVersion {
    fn default() -> Self {
        Self(semver::Version::new(0, 0, 0))
    }
}

impl fmt::Display for OperatorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The version parts are not document fields; they only decide whether the
// version as a whole was set.
impl Inspect for OperatorVersion {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::internal("Major", &self.0.major),
            Field::internal("Minor", &self.0.minor),
            Field::internal("Patch", &self.0.patch),
            Field::internal("Pre", FieldValue::String(self.0.pre.as_str())),
            Field::internal("Build", FieldValue::String(self.0.build.as_str())),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomResourceDefinitions {
    pub owned: Vec<CrdDescription>,
    pub required: Vec<CrdDescription>,
}

impl Inspect for CustomResourceDefinitions {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("Owned", &self.owned),
            Field::optional("Required", &self.required),
        ]
    }
}

/// A CRD the operator owns or requires. `name` is `<plural>.<group>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default, rename_all = "camelCase")]
#[builder(default, setter(into))]
pub struct CrdDescription {
    pub name: String,
    pub version: String,
    pub kind: String,
    pub display_name: String,
    pub description: String,
}

impl CrdDescription {
    pub fn builder() -> CrdDescriptionBuilder {
        CrdDescriptionBuilder::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiServiceDefinitions {
    pub owned: Vec<ApiServiceDescription>,
    pub required: Vec<ApiServiceDescription>,
}

impl Inspect for ApiServiceDefinitions {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("Owned", &self.owned),
            Field::optional("Required", &self.required),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default, rename_all = "camelCase")]
#[builder(default, setter(into))]
pub struct ApiServiceDescription {
    pub name: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub deployment_name: String,
    pub container_port: i32,
    pub display_name: String,
    pub description: String,
}

impl ApiServiceDescription {
    pub fn builder() -> ApiServiceDescriptionBuilder {
        ApiServiceDescriptionBuilder::default()
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.group, &self.version, &self.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppLink {
    pub name: String,
    pub url: String,
}

impl Inspect for AppLink {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("Name", &self.name),
            Field::optional("URL", &self.url),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Icon {
    #[serde(rename = "base64data")]
    pub data: String,
    #[serde(rename = "mediatype")]
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallMode {
    #[serde(rename = "type")]
    pub mode: String,
    pub supported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterServiceVersionStatus {
    pub phase: String,
    pub message: String,
    pub reason: String,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_transition_time: Option<DateTime<Utc>>,
    pub conditions: Vec<ClusterServiceVersionCondition>,
    pub requirement_status: Vec<RequirementStatus>,
}

impl Inspect for ClusterServiceVersionStatus {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("Phase", &self.phase),
            Field::optional("Message", &self.message),
            Field::optional("Reason", &self.reason),
            Field::optional("LastUpdateTime", timestamp(&self.last_update_time)),
            Field::optional("LastTransitionTime", timestamp(&self.last_transition_time)),
            Field::optional("Conditions", &self.conditions),
            Field::optional("RequirementStatus", &self.requirement_status),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterServiceVersionCondition {
    pub phase: String,
    pub message: String,
    pub reason: String,
    pub last_update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementStatus {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    pub status: String,
    pub message: String,
}

/// Custom resource definition, checked statically through its `garde` rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CustomResourceDefinition {
    #[serde(flatten)]
    #[garde(skip)]
    pub type_meta: TypeMeta,
    #[garde(skip)]
    pub metadata: ObjectMeta,
    #[garde(dive)]
    pub spec: CrdSpec,
}

impl CustomResourceDefinition {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Versions this definition serves, whichever form declared them.
    pub fn served_versions(&self) -> Vec<&str> {
        if self.spec.versions.is_empty() {
            return if self.spec.version.is_empty() {
                Vec::new()
            } else {
                vec![self.spec.version.as_str()]
            };
        }
        self.spec
            .versions
            .iter()
            .filter(|version| version.served)
            .map(|version| version.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CrdSpec {
    #[garde(pattern(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)+$"))]
    pub group: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    #[garde(pattern(r"^([a-z0-9]([-a-z0-9]*[a-z0-9])?)?$"))]
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[garde(dive, custom(single_storage_version))]
    pub versions: Vec<CrdVersion>,
    #[garde(dive)]
    pub names: CrdNames,
    #[garde(pattern(r"^(Namespaced|Cluster)$"))]
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub validation: Option<CustomResourceValidation>,
}

#[allow(clippy::ptr_arg)]
fn single_storage_version(versions: &Vec<CrdVersion>, _: &()) -> garde::Result {
    if versions.is_empty() {
        return Ok(());
    }
    let storage = versions.iter().filter(|version| version.storage).count();
    if storage != 1 {
        return Err(garde::Error::new(format!(
            "must have exactly one version marked as storage version, found {storage}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder, Validate)]
#[serde(default)]
#[builder(default, setter(into))]
pub struct CrdVersion {
    #[garde(pattern(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$"))]
    pub name: String,
    #[garde(skip)]
    pub served: bool,
    #[garde(skip)]
    pub storage: bool,
}

impl CrdVersion {
    pub fn builder() -> CrdVersionBuilder {
        CrdVersionBuilder::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CrdNames {
    #[garde(pattern(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$"))]
    pub plural: String,
    #[garde(skip)]
    pub singular: String,
    #[garde(length(min = 1))]
    pub kind: String,
    #[garde(skip)]
    pub list_kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[garde(skip)]
    pub short_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomResourceValidation {
    #[serde(rename = "openAPIV3Schema")]
    pub open_api_v3_schema: Value,
}

/// Catalog of operator packages. Only decoded, never inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSource {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: CatalogSourceSpec,
    pub status: CatalogSourceStatus,
}

impl CatalogSource {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogSourceSpec {
    pub source_type: String,
    pub config_map: String,
    pub address: String,
    pub image: String,
    pub display_name: String,
    pub description: String,
    pub publisher: String,
    pub icon: Icon,
    pub secrets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogSourceStatus {
    pub config_map_reference: Option<ConfigMapReference>,
    pub registry_service: Option<RegistryServiceStatus>,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigMapReference {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    pub resource_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryServiceStatus {
    pub protocol: String,
    pub service_name: String,
    pub service_namespace: String,
    pub port: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Generic object header used when only the identity of a document matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialObject {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
}
