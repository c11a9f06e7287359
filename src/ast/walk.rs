//! File-restricted breadth-first cursor traversal.

use std::collections::VecDeque;

use super::{Cursor, FileSet};

/// Lazy breadth-first walk over cursors originating in a [`FileSet`].
///
/// A cursor without a location is skipped together with its subtree. A
/// cursor from a file outside the set is pruned: its children are never
/// visited, even when they come from a file inside the set. This keeps the
/// walk out of system-header expansions.
///
/// The walk is single pass; call [`walk`] again to restart.
pub struct Walk<'f, C> {
    queue: VecDeque<C>,
    files: &'f FileSet,
}

/// Start a walk at the given roots (usually the translation unit's children).
pub fn walk<C, I>(roots: I, files: &FileSet) -> Walk<'_, C>
where
    C: Cursor,
    I: IntoIterator<Item = C>,
{
    Walk {
        queue: roots.into_iter().collect(),
        files,
    }
}

impl<C: Cursor> Iterator for Walk<'_, C> {
    type Item = C;

    fn next(&mut self) -> Option<C> {
        while let Some(cursor) = self.queue.pop_front() {
            let Some(file) = cursor.file() else {
                continue;
            };
            if self.files.contains(&file) {
                self.queue.extend(cursor.children());
                return Some(cursor);
            }
        }
        None
    }
}
