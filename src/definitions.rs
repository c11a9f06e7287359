//! Library function declarations: the universe coverage is measured against.

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::ast::{Cursor, CursorKind, Span};
use crate::error::CoverageError;

/// One function declared in the library's public headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// Bare symbol name.
    pub ident: String,
    /// Signature as displayed in reports, e.g. `git_repository_open(git_repository **, const char *)`.
    pub display: String,
    /// Declaring header.
    pub file: PathBuf,
    pub span: Span,
    /// Spelled type of the first parameter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl Definition {
    /// Build a definition from a function declaration cursor.
    pub fn from_cursor<C: Cursor>(cursor: &C) -> Option<Self> {
        if cursor.kind() != CursorKind::FunctionDecl {
            return None;
        }

        let ident = cursor.spelling()?;
        let display = cursor.display_name().unwrap_or_else(|| ident.clone());

        Some(Self {
            ident,
            display,
            file: cursor.file()?,
            span: cursor.extent().unwrap_or_default(),
            receiver: cursor.first_parameter_type(),
        })
    }
}

/// A definition that replaced an earlier one with the same identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub ident: String,
    pub previous: (PathBuf, Span),
    pub replacement: (PathBuf, Span),
}

/// Definitions keyed by identifier.
///
/// The last declaration of an identifier wins. Redeclarations at the same
/// file and line (the same header seen through two entry points) are not
/// duplicates; anything else is recorded.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    by_ident: BTreeMap<String, Definition>,
    duplicates: Vec<Duplicate>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, returning the duplicate record if it replaced a
    /// declaration from a different location.
    pub fn insert(&mut self, definition: Definition) -> Option<Duplicate> {
        let replacement = (definition.file.clone(), definition.span);
        let previous = self.by_ident.insert(definition.ident.clone(), definition)?;

        let same_place =
            previous.file == replacement.0 && previous.span.start_line == replacement.1.start_line;
        if same_place {
            return None;
        }

        let duplicate = Duplicate {
            ident: previous.ident,
            previous: (previous.file, previous.span),
            replacement,
        };
        self.duplicates.push(duplicate.clone());
        Some(duplicate)
    }

    pub fn get(&self, ident: &str) -> Option<&Definition> {
        self.by_ident.get(ident)
    }

    pub fn len(&self) -> usize {
        self.by_ident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ident.is_empty()
    }

    /// Definitions in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.by_ident.values()
    }

    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    /// Definitions grouped by declaring file, files in lexical path order.
    pub fn by_file(&self) -> BTreeMap<&Path, Vec<&Definition>> {
        self.iter().fold(BTreeMap::new(), |mut groups, def| {
            groups.entry(def.file.as_path()).or_insert_with(Vec::new).push(def);
            groups
        })
    }
}

impl Extend<Definition> for DefinitionSet {
    fn extend<T: IntoIterator<Item = Definition>>(&mut self, iter: T) {
        for definition in iter {
            if let Some(dup) = self.insert(definition) {
                tracing::warn!(
                    "duplicate declaration of {} at {}:{} (previous at {}:{}), keeping the last one",
                    dup.ident,
                    dup.replacement.0.display(),
                    dup.replacement.1,
                    dup.previous.0.display(),
                    dup.previous.1,
                );
            }
        }
    }
}

impl IntoIterator for DefinitionSet {
    type Item = Definition;
    type IntoIter = std::collections::btree_map::IntoValues<String, Definition>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_ident.into_values()
    }
}

impl FromIterator<Definition> for DefinitionSet {
    fn from_iter<T: IntoIterator<Item = Definition>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Collect definitions from walked cursors.
pub fn collect_definitions<C, I>(cursors: I) -> DefinitionSet
where
    C: Cursor,
    I: IntoIterator<Item = C>,
{
    cursors
        .into_iter()
        .filter_map(|cursor| Definition::from_cursor(&cursor))
        .collect()
}

/// Compile a header glob. Patterns are matched against paths relative to the
/// include directory, and `*` does not cross directory separators.
pub fn header_matcher(pattern: &str) -> Result<GlobMatcher, CoverageError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| CoverageError::Glob {
            pattern: pattern.to_string(),
            source,
        })
}

/// List the library headers under `include_dir` matching `pattern`, sorted.
pub fn list_headers(include_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, CoverageError> {
    let matcher = header_matcher(pattern)?;
    let mut headers = Vec::new();

    for entry in WalkDir::new(include_dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(include_dir).unwrap_or(path);
        if matcher.is_match(relative) {
            headers.push(path.to_path_buf());
        }
    }

    headers.sort();
    Ok(headers)
}

/// The umbrella header conventionally sitting next to the include directory
/// (`/usr/include/git2` → `/usr/include/git2.h`).
pub fn sibling_umbrella(include_dir: &Path) -> Option<PathBuf> {
    let name = include_dir.file_name()?;
    let mut file_name = name.to_os_string();
    file_name.push(".h");
    let candidate = include_dir.with_file_name(file_name);
    candidate.is_file().then_some(candidate)
}
