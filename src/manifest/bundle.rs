//! Discovery of manifest files inside an operator package directory.
//!
//! A package holds at most one package file and one sub-directory per bundle
//! version:
//!
//! ```text
//! etcd/
//!   etcd.package.yaml
//!   0.9.2/
//!     etcdoperator.v0.9.2.clusterserviceversion.yaml
//!     etcdclusters.etcd.database.coreos.com.crd.yaml
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::manifest::errors::{Error, Result};

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestBundle {
    /// First directory below the package root; empty for top-level files.
    pub version: String,
    pub csvs: Vec<PathBuf>,
    pub crds: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageLayout {
    pub root: PathBuf,
    pub package: Option<PathBuf>,
    pub bundles: Vec<ManifestBundle>,
}

impl PackageLayout {
    /// CSV and CRD files of every bundle, bundle by bundle.
    pub fn manifest_files(&self) -> impl Iterator<Item = &Path> {
        self.bundles
            .iter()
            .flat_map(|bundle| bundle.csvs.iter().chain(&bundle.crds))
            .map(PathBuf::as_path)
    }
}

pub fn discover_bundle(root: &Path) -> Result<PackageLayout> {
    let root = root.to_path_buf().clean();
    if !root.is_dir() {
        return Err(Error::invalid_format(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut package: Option<PathBuf> = None;
    let mut bundles: BTreeMap<String, ManifestBundle> = BTreeMap::new();

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_lowercase();
        let path = entry.path().to_path_buf();

        if file_name.contains("package") {
            if let Some(first) = package {
                return Err(Error::MultiplePackages {
                    root,
                    first,
                    second: path,
                });
            }
            package = Some(path);
            continue;
        }
        if !is_manifest_file(&path) {
            continue;
        }

        let version = bundle_version(&root, &path);
        if file_name.contains("clusterserviceversion") {
            bundle_entry(&mut bundles, version).csvs.push(path);
        } else if file_name.contains("crd") {
            bundle_entry(&mut bundles, version).crds.push(path);
        }
    }

    debug!(
        root = %root.display(),
        bundles = bundles.len(),
        has_package = package.is_some(),
        "discovered package layout"
    );

    Ok(PackageLayout {
        root,
        package,
        bundles: bundles.into_values().collect(),
    })
}

fn bundle_entry(bundles: &mut BTreeMap<String, ManifestBundle>, version: String) -> &mut ManifestBundle {
    bundles
        .entry(version.clone())
        .or_insert_with(|| ManifestBundle {
            version,
            ..ManifestBundle::default()
        })
}

fn is_manifest_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            MANIFEST_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
}

fn bundle_version(root: &Path, path: &Path) -> String {
    let Ok(relative) = path.strip_prefix(root) else {
        return String::new();
    };
    let components: Vec<_> = relative.components().collect();
    if components.len() < 2 {
        return String::new();
    }
    components[0].as_os_str().to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn groups_manifests_by_version_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "etcd.package.yaml");
        touch(dir.path(), "0.9.2/etcdoperator.v0.9.2.clusterserviceversion.yaml");
        touch(dir.path(), "0.9.2/etcdclusters.etcd.database.coreos.com.crd.yaml");
        touch(dir.path(), "0.9.0/etcdoperator.v0.9.0.clusterserviceversion.yaml");
        touch(dir.path(), "0.9.0/README.md");

        let layout = discover_bundle(dir.path()).unwrap();

        assert_eq!(layout.package, Some(dir.path().join("etcd.package.yaml")));
        let versions: Vec<_> = layout.bundles.iter().map(|b| b.version.as_str()).collect();
        assert_eq!(versions, ["0.9.0", "0.9.2"]);
        assert_eq!(layout.bundles[1].crds.len(), 1);
        assert_eq!(layout.manifest_files().count(), 3);
    }

    #[test]
    fn second_package_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.package.yaml");
        touch(dir.path(), "b.package.yaml");

        let error = discover_bundle(dir.path()).unwrap_err();

        assert!(matches!(error, Error::MultiplePackages { .. }));
    }

    #[test]
    fn top_level_manifests_have_no_version() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "operator.clusterserviceversion.json");

        let layout = discover_bundle(dir.path()).unwrap();

        assert_eq!(layout.bundles.len(), 1);
        assert_eq!(layout.bundles[0].version, "");
        assert!(layout.package.is_none());
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "operator.clusterserviceversion.yaml");
        let error = discover_bundle(&dir.path().join("operator.clusterserviceversion.yaml")).unwrap_err();
        assert!(matches!(error, Error::InvalidFormat(_)));
    }
}
