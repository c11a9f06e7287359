//! Error types shared by the analysis pipeline.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can abort a coverage run.
#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("no libclang shared library found (searched: {})", join_paths(.searched))]
    LibraryNotFound { searched: Vec<PathBuf> },
    #[error("failed to load libclang from {}: {message}", .path.display())]
    LibraryLoad { path: PathBuf, message: String },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    /// The translation unit reported at least one error-severity diagnostic.
    #[error("{}: {errors} error diagnostic(s)", .path.display())]
    Diagnostics { path: PathBuf, errors: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid header glob {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("failed to encode cache artifact {}: {source}", .path.display())]
    CacheEncode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl CoverageError {
    /// Whether this error came from compiler diagnostics rather than setup or IO.
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, CoverageError::Diagnostics { .. })
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build a configuration error for a path that does not exist.
pub(crate) fn missing_path(what: &str, path: &Path) -> CoverageError {
    CoverageError::Config(format!("{} does not exist: {}", what, path.display()))
}
