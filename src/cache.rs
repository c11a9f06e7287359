//! Per-source-file cache of extracted call maps.
//!
//! Each analyzed source file gets one artifact, `.<basename>.cache`, in the
//! cache directory. An artifact is reused only while its modification time is
//! strictly newer than the source's; otherwise the call map is rebuilt and the
//! artifact rewritten. Unreadable, corrupt or foreign artifacts count as
//! misses, as do artifacts extracted with a different include directory or
//! different compiler flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::calls::CallMap;
use crate::error::CoverageError;

/// Bumped whenever the artifact layout or the meaning of its contents changes.
pub const CACHE_FORMAT_VERSION: u32 = 2;

const ARTIFACT_SUFFIX: &str = ".cache";

#[derive(Debug, Serialize, Deserialize)]
struct Artifact {
    version: u32,
    source: PathBuf,
    include_dir: PathBuf,
    compiler_flags: Vec<String>,
    calls: CallMap,
}

/// File-based call map cache.
#[derive(Debug, Clone)]
pub struct CallCache {
    dir: PathBuf,
    enabled: bool,
    include_dir: PathBuf,
    compiler_flags: Vec<String>,
}

impl CallCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, CoverageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            enabled: true,
            include_dir: PathBuf::new(),
            compiler_flags: Vec::new(),
        })
    }

    /// Tie artifacts to the extraction settings: an artifact written under a
    /// different include directory or flag list is a miss.
    pub fn keyed(mut self, include_dir: &Path, compiler_flags: &[String]) -> Self {
        self.include_dir = include_dir.to_path_buf();
        self.compiler_flags = compiler_flags.to_vec();
        self
    }

    /// A cache that never reads or writes artifacts.
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
            include_dir: PathBuf::new(),
            compiler_flags: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact location for a source file.
    pub fn artifact_path(&self, source: &Path) -> PathBuf {
        let base = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir.join(format!(".{}{}", base, ARTIFACT_SUFFIX))
    }

    /// Return the cached call map for `source`, or build and store it.
    ///
    /// A failing `build` leaves any existing artifact untouched.
    pub fn load_or_build<F>(&self, source: &Path, build: F) -> Result<CallMap, CoverageError>
    where
        F: FnOnce() -> Result<CallMap, CoverageError>,
    {
        if !self.enabled {
            return build();
        }

        if let Some(calls) = self.load(source) {
            tracing::debug!("cache hit for {}", source.display());
            return Ok(calls);
        }

        tracing::debug!("cache miss for {}", source.display());
        let calls = build()?;
        self.store(source, &calls)?;
        Ok(calls)
    }

    /// Read a fresh artifact for `source`.
    pub fn load(&self, source: &Path) -> Option<CallMap> {
        let path = self.artifact_path(source);
        if !is_newer(&path, source) {
            return None;
        }

        let bytes = fs::read(&path).ok()?;
        let artifact: Artifact = match serde_json::from_slice(&bytes) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!("discarding unreadable cache artifact {}: {}", path.display(), e);
                return None;
            }
        };

        if artifact.version != CACHE_FORMAT_VERSION {
            tracing::debug!("cache artifact {} has version {}", path.display(), artifact.version);
            return None;
        }
        if artifact.source != source {
            tracing::debug!(
                "cache artifact {} belongs to {}",
                path.display(),
                artifact.source.display()
            );
            return None;
        }
        if artifact.include_dir != self.include_dir
            || artifact.compiler_flags != self.compiler_flags
        {
            tracing::debug!(
                "cache artifact {} was extracted with other settings",
                path.display()
            );
            return None;
        }

        Some(artifact.calls)
    }

    /// Write the artifact for `source`.
    pub fn store(&self, source: &Path, calls: &CallMap) -> Result<(), CoverageError> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.artifact_path(source);
        let artifact = Artifact {
            version: CACHE_FORMAT_VERSION,
            source: source.to_path_buf(),
            include_dir: self.include_dir.clone(),
            compiler_flags: self.compiler_flags.clone(),
            calls: calls.clone(),
        };
        let bytes = serde_json::to_vec(&artifact).map_err(|source| CoverageError::CacheEncode {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, bytes)?;
        Ok(())
    }

    /// Remove every artifact in the cache directory. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, CoverageError> {
        if !self.enabled || !self.dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') && name.ends_with(ARTIFACT_SUFFIX) && entry.path().is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Whether `a` was modified strictly after `b`. Missing files are never newer.
fn is_newer(a: &Path, b: &Path) -> bool {
    match (modified(a), modified(b)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
