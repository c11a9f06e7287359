//! libclang-backed AST provider.
//!
//! libclang is loaded at runtime. [`Frontend::load`] probes the candidate
//! directories from [`library::candidate_dirs`], points the loader at the
//! first libclang found and keeps the resulting `Clang` handle for the rest of
//! the run. Only one `Frontend` may exist per process.

mod entity;
pub mod library;

use clang::diagnostic::Severity;
use clang::{Clang, Entity, Index, TranslationUnit};
use std::path::{Path, PathBuf};

use crate::error::CoverageError;

/// Environment variable the runtime loader reads the library location from.
const LIBCLANG_PATH_ENV: &str = "LIBCLANG_PATH";

/// A loaded libclang.
pub struct Frontend {
    clang: Clang,
    library: PathBuf,
}

impl std::fmt::Debug for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontend")
            .field("library", &self.library)
            .finish()
    }
}

impl Frontend {
    /// Locate and load libclang, trying `configured` first.
    pub fn load(configured: Option<&Path>) -> Result<Self, CoverageError> {
        let searched = library::candidate_dirs(configured);
        let library = library::find_library(&searched)
            .ok_or(CoverageError::LibraryNotFound { searched })?;

        std::env::set_var(LIBCLANG_PATH_ENV, &library);

        let clang = Clang::new().map_err(|message| CoverageError::LibraryLoad {
            path: library.clone(),
            message,
        })?;

        Ok(Self { clang, library })
    }

    /// Path of the loaded shared library.
    pub fn library(&self) -> &Path {
        &self.library
    }

    /// Create an index. Translation units borrow from it.
    pub fn index(&self) -> Index<'_> {
        Index::new(&self.clang, false, false)
    }
}

/// Parse `path` with `flags`.
///
/// `skip_bodies` drops function bodies, which is all that is needed when only
/// declarations matter.
pub fn parse<'i>(
    index: &'i Index<'_>,
    path: &Path,
    flags: &[String],
    skip_bodies: bool,
) -> Result<TranslationUnit<'i>, CoverageError> {
    index
        .parser(path)
        .arguments(flags)
        .skip_function_bodies(skip_bodies)
        .parse()
        .map_err(|e| CoverageError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Diagnostic counts for one translation unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub warnings: usize,
    pub errors: usize,
}

/// Print every diagnostic of `unit` to stderr, then fail if any of them was
/// an error.
pub fn check_diagnostics(
    unit: &TranslationUnit<'_>,
    path: &Path,
) -> Result<DiagnosticSummary, CoverageError> {
    let mut summary = DiagnosticSummary::default();

    for diagnostic in unit.get_diagnostics() {
        eprintln!("{}", diagnostic);
        match diagnostic.get_severity() {
            Severity::Error | Severity::Fatal => summary.errors += 1,
            Severity::Warning => summary.warnings += 1,
            _ => {}
        }
    }

    if summary.errors > 0 {
        return Err(CoverageError::Diagnostics {
            path: path.to_path_buf(),
            errors: summary.errors,
        });
    }
    Ok(summary)
}

/// Top-level cursors of a translation unit, where walks start.
pub fn roots<'tu>(unit: &'tu TranslationUnit<'_>) -> Vec<Entity<'tu>> {
    unit.get_entity().get_children()
}
