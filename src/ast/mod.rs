//! Compiler-frontend independent view of a parsed translation unit.
//!
//! The walker, call extractor and definition scanner only ever see the
//! [`Cursor`] trait. The libclang-backed implementation lives in
//! `crate::frontend`; unit tests drive the same code with a synthetic tree.

mod walk;

#[cfg(test)]
pub(crate) mod fixture;

pub use walk::{walk, Walk};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// The cursor kinds the analysis distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    CallExpr,
    DeclRefExpr,
    FunctionDecl,
    Other,
}

impl CursorKind {
    /// Whether a cursor of this kind can reference a called function.
    pub fn is_reference(&self) -> bool {
        matches!(self, CursorKind::CallExpr | CursorKind::DeclRefExpr)
    }
}

/// Source extent with 1-indexed line and column positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Whether `other` lies within this span, bounds included.
    pub fn encloses(&self, other: &Span) -> bool {
        (self.start_line, self.start_col) <= (other.start_line, other.start_col)
            && (other.end_line, other.end_col) <= (self.end_line, self.end_col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A node of a parsed translation unit.
///
/// Implementations are expected to be cheap handles (libclang cursors are
/// plain value types), so the walker clones them freely.
pub trait Cursor: Clone {
    fn kind(&self) -> CursorKind;

    /// File the cursor originates from, or `None` for implicit/builtin nodes.
    fn file(&self) -> Option<PathBuf>;

    fn extent(&self) -> Option<Span>;

    /// Bare symbol name.
    fn spelling(&self) -> Option<String>;

    /// Human-readable name; for functions this includes parameter types.
    fn display_name(&self) -> Option<String>;

    /// Declaration this cursor refers to, if it resolves.
    fn referenced(&self) -> Option<Self>;

    fn children(&self) -> Vec<Self>;

    /// Spelled type of the first parameter of a function declaration.
    fn first_parameter_type(&self) -> Option<String> {
        None
    }
}

/// Set of files whose cursors are of interest to a walk.
///
/// Paths are compared as given; callers normalize them up front.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: HashSet<PathBuf>,
}

impl FileSet {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for FileSet {
    fn from_iter<T: IntoIterator<Item = P>>(iter: T) -> Self {
        Self::new(iter)
    }
}
