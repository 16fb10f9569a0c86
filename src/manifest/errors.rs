//! Operational errors raised while loading manifests.
//!
//! Findings about a manifest's content are never reported through this type;
//! they are collected as [`ValidationError`](crate::manifest::result::ValidationError)
//! values inside a [`ManifestResult`](crate::manifest::result::ManifestResult).

use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("more than one package file in {}: {} and {}", .root.display(), .first.display(), .second.display())]
    MultiplePackages {
        root: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    pub fn file_not_found(path: &Path) -> Self {
        Self::FileNotFound(path.to_path_buf())
    }

    /// A missing file is `FileNotFound`; any other read failure keeps its cause.
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn invalid_format(message: impl ToString) -> Self {
        Self::InvalidFormat(message.to_string())
    }
}
