//! Locating the libclang shared library.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Directories tried after the configured one and `llvm-config --libdir`.
const FALLBACK_DIRS: &[&str] = &[
    "/usr/lib/llvm/lib",
    "/usr/lib64/llvm",
    "/usr/local/opt/llvm/lib",
    "/opt/homebrew/opt/llvm/lib",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib64",
    "/usr/lib",
];

/// Shared object names recognized as libclang.
const LIBRARY_PATTERNS: &[&str] = &[
    "libclang.so",
    "libclang.so.*",
    "libclang-[0-9]*.so",
    "libclang-[0-9]*.so.*",
    "libclang.dylib",
    "libclang.dll",
];

/// Ordered candidate directories for libclang.
///
/// The configured directory comes first, then whatever `llvm-config` reports,
/// then fixed fallbacks including versioned `/usr/lib/llvm-*/lib` trees,
/// newest first.
pub fn candidate_dirs(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(dir) = configured {
        dirs.push(dir.to_path_buf());
    }
    if let Some(dir) = llvm_config_libdir() {
        dirs.push(dir);
    }
    dirs.extend(versioned_llvm_dirs(Path::new("/usr/lib")));
    dirs.extend(FALLBACK_DIRS.iter().map(PathBuf::from));

    let mut unique = Vec::with_capacity(dirs.len());
    for dir in dirs {
        if !unique.contains(&dir) {
            unique.push(dir);
        }
    }
    unique
}

/// First libclang shared object found in `dirs`, probing them in order.
pub fn find_library(dirs: &[PathBuf]) -> Option<PathBuf> {
    let patterns = library_patterns();
    dirs.iter().find_map(|dir| find_in_dir(dir, &patterns))
}

fn find_in_dir(dir: &Path, patterns: &GlobSet) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| patterns.is_match(e.file_name()))
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    // Prefer the unversioned name, then the shortest.
    matches.sort_by_key(|p| (p.as_os_str().len(), p.clone()));
    matches.into_iter().next()
}

fn library_patterns() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in LIBRARY_PATTERNS {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Ask `llvm-config` for its library directory.
fn llvm_config_libdir() -> Option<PathBuf> {
    let output = Command::new("llvm-config").arg("--libdir").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let dir = String::from_utf8(output.stdout).ok()?;
    let dir = dir.trim();
    (!dir.is_empty()).then(|| PathBuf::from(dir))
}

/// `<root>/llvm-<version>/lib` directories, highest version first.
fn versioned_llvm_dirs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut found: Vec<(Vec<u32>, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let version = name.strip_prefix("llvm-")?;
            let key = version
                .split('.')
                .map(|part| part.parse::<u32>().ok())
                .collect::<Option<Vec<_>>>()?;
            Some((key, e.path().join("lib")))
        })
        .collect();

    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.into_iter().map(|(_, dir)| dir).collect()
}
