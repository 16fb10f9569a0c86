//! Completeness and consistency checks for operator manifests.
//!
//! Cluster service versions are walked field by field to find empty
//! mandatory and optional fields, and their example annotations are matched
//! against the APIs they own. Custom resource definitions are checked
//! statically.

pub mod manifest;

pub use manifest::core::{ClusterServiceVersion, CustomResourceDefinition};
pub use manifest::errors::{Error, Result};
pub use manifest::result::{ErrorKind, ManifestResult, ValidationError, any_errors};
pub use manifest::validate::{validate_file, validate_path};
pub use manifest::validator::{CrdValidator, CsvValidator, ManifestObject, Validator};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Installs the global `tracing` subscriber, writing to stderr. `RUST_LOG`
/// takes precedence over `verbose`.
pub fn init_logging(verbose: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let default = if verbose {
            "manifest_verify=debug"
        } else {
            "manifest_verify=warn"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();

        // Fails only if a subscriber is already installed.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
