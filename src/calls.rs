//! Call extraction: which library functions a source file references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ast::{Cursor, CursorKind, Span};

/// One call or reference expression resolving to a library function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Name of the referenced declaration.
    pub ident: String,
    /// File containing the call site.
    pub file: PathBuf,
    pub span: Span,
    /// File declaring the referenced function.
    pub decl_file: PathBuf,
}

/// Identifier → calls in encounter order.
pub type CallMap = BTreeMap<String, Vec<Call>>;

impl Call {
    /// Build a call record from a reference cursor.
    ///
    /// Returns `None` unless the cursor is a call or decl-ref expression that
    /// resolves to a located function declaration under `include_dir`.
    pub fn from_cursor<C: Cursor>(cursor: &C, include_dir: &Path) -> Option<Self> {
        if !cursor.kind().is_reference() {
            return None;
        }

        let decl = cursor.referenced()?;
        if decl.kind() != CursorKind::FunctionDecl {
            return None;
        }

        let decl_file = decl.file()?;
        if !decl_file.starts_with(include_dir) {
            return None;
        }

        let ident = decl.spelling().or_else(|| cursor.display_name())?;

        Some(Self {
            ident,
            file: cursor.file()?,
            span: cursor.extent().unwrap_or_default(),
            decl_file,
        })
    }
}

/// Collect library calls from walked cursors.
///
/// A call expression and the reference to its callee nested under it count as
/// one call site. This relies on the call being visited before its children,
/// which the breadth-first [`walk`](crate::ast::walk) guarantees.
pub fn extract_calls<C, I>(cursors: I, include_dir: &Path) -> CallMap
where
    C: Cursor,
    I: IntoIterator<Item = C>,
{
    let mut calls = CallMap::new();

    for cursor in cursors {
        let Some(call) = Call::from_cursor(&cursor, include_dir) else {
            continue;
        };
        if cursor.kind() == CursorKind::DeclRefExpr && is_callee(&calls, &call) {
            continue;
        }
        calls.entry(call.ident.clone()).or_default().push(call);
    }

    calls
}

/// Whether `reference` is the callee of an already recorded call expression,
/// i.e. lies within the extent of a call to the same function in the same
/// file.
fn is_callee(calls: &CallMap, reference: &Call) -> bool {
    calls.get(&reference.ident).is_some_and(|recorded| {
        recorded
            .iter()
            .any(|call| call.file == reference.file && call.span.encloses(&reference.span))
    })
}

/// Merge per-file call maps, keeping file order and per-file encounter order.
pub fn aggregate<I>(per_file: I) -> CallMap
where
    I: IntoIterator<Item = CallMap>,
{
    per_file.into_iter().fold(CallMap::new(), |mut all, calls| {
        for (ident, list) in calls {
            all.entry(ident).or_default().extend(list);
        }
        all
    })
}

/// Whether `ident` has at least one recorded call.
pub fn is_called(calls: &CallMap, ident: &str) -> bool {
    calls.get(ident).is_some_and(|list| !list.is_empty())
}
