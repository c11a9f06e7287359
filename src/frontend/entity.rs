//! [`Cursor`] implementation over libclang entities.

use clang::source::SourceLocation;
use clang::{Entity, EntityKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::ast::{Cursor, CursorKind, Span};

thread_local! {
    /// libclang path as reported → canonical path. libclang hands out the
    /// same few header paths for every cursor, so resolve each once.
    static CANONICAL: RefCell<HashMap<PathBuf, PathBuf>> = RefCell::new(HashMap::new());
}

/// Canonical form of a path reported by libclang.
///
/// libclang keeps paths as they were found through the `-I` search path, so a
/// header can come back relative, through a symlink or with `..` components.
/// Include-dir and source paths are canonical, and the comparison against
/// them is only meaningful if these are too. Paths that cannot be resolved
/// are returned unchanged.
pub(crate) fn canonical(path: PathBuf) -> PathBuf {
    CANONICAL.with(|cache| {
        if let Some(resolved) = cache.borrow().get(&path) {
            return resolved.clone();
        }
        let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
        cache.borrow_mut().insert(path, resolved.clone());
        resolved
    })
}

/// Expansion location: where macro-expanded code lands in the source, which
/// is where a reader expects a call to be reported.
fn expansion(location: SourceLocation<'_>) -> (Option<PathBuf>, u32, u32) {
    let loc = location.get_expansion_location();
    (loc.file.map(|f| canonical(f.get_path())), loc.line, loc.column)
}

impl<'tu> Cursor for Entity<'tu> {
    fn kind(&self) -> CursorKind {
        match self.get_kind() {
            EntityKind::CallExpr => CursorKind::CallExpr,
            EntityKind::DeclRefExpr => CursorKind::DeclRefExpr,
            EntityKind::FunctionDecl => CursorKind::FunctionDecl,
            _ => CursorKind::Other,
        }
    }

    fn file(&self) -> Option<PathBuf> {
        let (file, _, _) = expansion(self.get_location()?);
        file
    }

    fn extent(&self) -> Option<Span> {
        let range = self.get_range()?;
        let (_, start_line, start_col) = expansion(range.get_start());
        let (_, end_line, end_col) = expansion(range.get_end());
        Some(Span::new(start_line, start_col, end_line, end_col))
    }

    fn spelling(&self) -> Option<String> {
        self.get_name()
    }

    fn display_name(&self) -> Option<String> {
        self.get_display_name()
    }

    fn referenced(&self) -> Option<Self> {
        self.get_reference()
    }

    fn children(&self) -> Vec<Self> {
        self.get_children()
    }

    fn first_parameter_type(&self) -> Option<String> {
        let arguments = self.get_arguments()?;
        let first = arguments.first()?;
        Some(first.get_type()?.get_display_name())
    }
}
