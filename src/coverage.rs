//! Coverage computation: definitions joined against aggregated calls.

use serde::Serialize;
use std::path::PathBuf;

use crate::calls::{is_called, CallMap};
use crate::definitions::{Definition, DefinitionSet};

/// One definition and whether anything calls it.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageEntry {
    pub definition: Definition,
    pub used: bool,
    /// Number of recorded call sites.
    pub calls: usize,
}

/// Coverage of a single declaring header.
#[derive(Debug, Clone, Serialize)]
pub struct FileCoverage {
    pub path: PathBuf,
    /// Used entries first, then by identifier.
    pub entries: Vec<CoverageEntry>,
    pub used: usize,
    pub total: usize,
    pub percent: u32,
}

/// Coverage of the whole library.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    /// Files in lexical path order.
    pub files: Vec<FileCoverage>,
    pub used: usize,
    pub total: usize,
    pub percent: u32,
}

/// `floor(100 * used / total)`, or 0 when there is nothing to cover.
pub fn percent(used: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (used.min(total) * 100 / total) as u32
}

/// Compute per-file and total coverage.
pub fn compute(definitions: &DefinitionSet, calls: &CallMap) -> CoverageReport {
    let files: Vec<FileCoverage> = definitions
        .by_file()
        .into_iter()
        .map(|(path, defs)| file_coverage(path.to_path_buf(), defs, calls))
        .collect();

    let used = files.iter().map(|f| f.used).sum();
    let total = files.iter().map(|f| f.total).sum();

    CoverageReport {
        files,
        used,
        total,
        percent: percent(used, total),
    }
}

fn file_coverage(path: PathBuf, defs: Vec<&Definition>, calls: &CallMap) -> FileCoverage {
    let mut entries: Vec<CoverageEntry> = defs
        .into_iter()
        .map(|def| CoverageEntry {
            used: is_called(calls, &def.ident),
            calls: calls.get(&def.ident).map_or(0, Vec::len),
            definition: def.clone(),
        })
        .collect();
    entries.sort_by(|a, b| {
        (!a.used, &a.definition.ident).cmp(&(!b.used, &b.definition.ident))
    });

    let total = entries.len();
    let used = entries.iter().filter(|e| e.used).count();

    FileCoverage {
        path,
        entries,
        used,
        total,
        percent: percent(used, total),
    }
}

impl CoverageReport {
    /// Definitions nothing calls, across all files.
    pub fn unused(&self) -> impl Iterator<Item = &Definition> {
        self.files
            .iter()
            .flat_map(|f| f.entries.iter())
            .filter(|e| !e.used)
            .map(|e| &e.definition)
    }

    pub fn file(&self, name: &str) -> Option<&FileCoverage> {
        self.files.iter().find(|f| {
            f.path.file_name().map(|n| n == name).unwrap_or(false) || f.path.as_os_str() == name
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::calls::Call;

    fn def(ident: &str, display: &str, file: &str) -> Definition {
        Definition {
            ident: ident.to_string(),
            display: display.to_string(),
            file: PathBuf::from(file),
            span: Span::default(),
            receiver: None,
        }
    }

    fn calls_to(idents: &[&str]) -> CallMap {
        idents
            .iter()
            .map(|ident| {
                (
                    ident.to_string(),
                    vec![Call {
                        ident: ident.to_string(),
                        file: PathBuf::from("/src/wrap.c"),
                        span: Span::default(),
                        decl_file: PathBuf::from("/inc/lib/lib.h"),
                    }],
                )
            })
            .collect()
    }

    fn lib_abc() -> DefinitionSet {
        vec![
            def("a", "a(int)", "/inc/lib/lib.h"),
            def("b", "b()", "/inc/lib/lib.h"),
            def("c", "c(char *)", "/inc/lib/lib.h"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_two_of_three_called() {
        let report = compute(&lib_abc(), &calls_to(&["a", "c"]));

        assert_eq!(report.files.len(), 1);
        let file = report.file("lib.h").expect("lib.h should be reported");
        assert_eq!((file.used, file.total, file.percent), (2, 3, 66));
        assert_eq!((report.used, report.total, report.percent), (2, 3, 66));

        let unused: Vec<_> = report.unused().map(|d| d.ident.as_str()).collect();
        assert_eq!(unused, vec!["b"]);
    }

    #[test]
    fn test_entries_sorted_used_first_then_by_name() {
        let report = compute(&lib_abc(), &calls_to(&["c"]));
        let order: Vec<_> = report.files[0]
            .entries
            .iter()
            .map(|e| e.definition.ident.as_str())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_call_list_is_unused() {
        let mut calls = calls_to(&["a"]);
        calls.insert("b".to_string(), Vec::new());
        let report = compute(&lib_abc(), &calls);
        assert_eq!(report.used, 1);
    }

    #[test]
    fn test_calls_to_unknown_identifiers_are_ignored() {
        let report = compute(&lib_abc(), &calls_to(&["a", "not_in_lib"]));
        assert_eq!(report.used, 1);
        assert_eq!(report.total, 3);
    }

    #[test]
    fn test_total_is_weighted_by_file_size() {
        let defs: DefinitionSet = vec![
            def("x1", "x1()", "/inc/lib/x.h"),
            def("y1", "y1()", "/inc/lib/y.h"),
            def("y2", "y2()", "/inc/lib/y.h"),
            def("y3", "y3()", "/inc/lib/y.h"),
            def("y4", "y4()", "/inc/lib/y.h"),
        ]
        .into_iter()
        .collect();
        let report = compute(&defs, &calls_to(&["x1", "y1"]));

        assert_eq!(report.file("x.h").map(|f| f.percent), Some(100));
        assert_eq!(report.file("y.h").map(|f| f.percent), Some(25));
        // 2 of 5, not the mean of 100% and 25%.
        assert_eq!(report.percent, 40);
        let used: usize = report.files.iter().map(|f| f.used).sum();
        let total: usize = report.files.iter().map(|f| f.total).sum();
        assert_eq!(report.percent, percent(used, total));
    }

    #[test]
    fn test_no_definitions() {
        let report = compute(&DefinitionSet::new(), &calls_to(&["a"]));
        assert!(report.files.is_empty());
        assert_eq!((report.used, report.total, report.percent), (0, 0, 0));
    }

    #[test]
    fn test_percent_floors_and_stays_in_range() {
        assert_eq!(percent(0, 7), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(29, 100), 29);
        assert_eq!(percent(199, 200), 99);
        assert_eq!(percent(7, 7), 100);
        assert_eq!(percent(0, 0), 0);
        for total in 1..50 {
            for used in 0..=total {
                let p = percent(used, total);
                assert!(p <= 100);
                assert_eq!(p as usize, used * 100 / total);
            }
        }
    }
}
