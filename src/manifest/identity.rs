//! Group/version/kind identities shared by owned APIs and examples.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::result::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

/// Ordered so reports built from it are stable between runs.
pub type IdentitySet = BTreeSet<ResourceIdentity>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("couldn't parse plural.group from crd name: {name}")]
    MissingGroup { name: String },

    #[error("couldn't parse group/version from api version {api_version:?} of kind: {kind}")]
    MissingVersion { api_version: String, kind: String },
}

impl IdentityError {
    /// The declaration text that failed to split.
    pub fn input(&self) -> &str {
        match self {
            Self::MissingGroup { name } => name,
            Self::MissingVersion { api_version, .. } => api_version,
        }
    }

    pub fn into_validation_error(self, field_path: impl Into<String>) -> ValidationError {
        let input = self.input().to_string();
        ValidationError::parse_error(field_path, self.to_string()).with_value(input)
    }
}

impl ResourceIdentity {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Identity of an owned CRD declared as `<plural>.<group>`.
    ///
    /// Only the first `.` separates the plural from the group.
    pub fn from_owned_declaration(
        name: &str,
        version: &str,
        kind: &str,
    ) -> Result<Self, IdentityError> {
        let (_plural, group) = name.split_once('.').ok_or_else(|| IdentityError::MissingGroup {
            name: name.to_string(),
        })?;
        Ok(Self::new(group, version, kind))
    }

    /// Identity of an object declared with an `apiVersion` of `<group>/<version>`.
    pub fn from_example_declaration(api_version: &str, kind: &str) -> Result<Self, IdentityError> {
        let (group, version) =
            api_version
                .split_once('/')
                .ok_or_else(|| IdentityError::MissingVersion {
                    api_version: api_version.to_string(),
                    kind: kind.to_string(),
                })?;
        Ok(Self::new(group, version, kind))
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Renders a set as `[a; b]` for diagnostics.
pub fn display_set(set: &IdentitySet) -> String {
    let items: Vec<String> = set.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join("; "))
}
