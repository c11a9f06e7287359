//! Analysis configuration.
//!
//! A run is described by one [`AnalysisConfig`]. It can be assembled from a
//! YAML config file, command-line flags and the environment; see
//! `cli::resolve_config` for precedence.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::capabilities::Capabilities;
use crate::error::{missing_path, CoverageError};

/// Environment variable naming the library include directory.
pub const INCLUDE_DIR_ENV: &str = "APICOV_INCLUDE_DIR";

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["apicov.yaml", ".apicov.yaml"];

pub const DEFAULT_HEADER_GLOB: &str = "*.h";

/// Extensions of source files picked up when a directory is given.
const SOURCE_EXTENSIONS: &[&str] = &["c"];

/// Everything one coverage run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Directory holding the library's public headers.
    pub include_dir: PathBuf,
    /// Flags passed to the compiler frontend for every parse.
    pub compiler_flags: Vec<String>,
    pub cache_dir: PathBuf,
    /// Binding sources to analyze.
    pub source_files: Vec<PathBuf>,
    /// Header parsed to discover definitions. When unset, `<include_dir>.h`
    /// is used if it exists, otherwise every matching header is parsed.
    pub umbrella_header: Option<PathBuf>,
    /// Which headers under `include_dir` count as the library's own.
    pub header_glob: String,
    /// Abort the whole run on the first error diagnostic.
    pub strict: bool,
    pub use_cache: bool,
    /// Preferred directory to look for libclang in.
    pub libclang_dir: Option<PathBuf>,
}

impl AnalysisConfig {
    /// A configuration with defaults for everything but the include directory.
    pub fn new<P: Into<PathBuf>>(include_dir: P) -> Self {
        Self {
            include_dir: include_dir.into(),
            compiler_flags: Vec::new(),
            cache_dir: default_cache_dir(),
            source_files: Vec::new(),
            umbrella_header: None,
            header_glob: DEFAULT_HEADER_GLOB.to_string(),
            strict: true,
            use_cache: true,
            libclang_dir: None,
        }
    }

    /// Canonicalize paths and expand source directories into `.c` files.
    ///
    /// Fails when the include directory, umbrella header or a source path
    /// does not exist.
    pub fn normalized(mut self) -> Result<Self, CoverageError> {
        if !self.include_dir.is_dir() {
            return Err(missing_path("include directory", &self.include_dir));
        }
        self.include_dir = self.include_dir.canonicalize()?;

        if let Some(umbrella) = self.umbrella_header.take() {
            if !umbrella.is_file() {
                return Err(missing_path("umbrella header", &umbrella));
            }
            self.umbrella_header = Some(umbrella.canonicalize()?);
        }

        let mut sources = Vec::new();
        for path in &self.source_files {
            if !path.exists() {
                return Err(missing_path("source", path));
            }
            if path.is_dir() {
                sources.extend(collect_sources(path)?);
            } else {
                sources.push(path.canonicalize()?);
            }
        }
        let mut seen = HashSet::new();
        sources.retain(|p| seen.insert(p.clone()));
        self.source_files = sources;

        Ok(self)
    }
}

/// Config file contents. Every field is optional and merged under CLI flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub include_dir: Option<PathBuf>,
    #[serde(default)]
    pub compiler_flags: Vec<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub umbrella_header: Option<PathBuf>,
    #[serde(default)]
    pub header_glob: Option<String>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub cache: Option<bool>,
    #[serde(default)]
    pub libclang_dir: Option<PathBuf>,
    /// Capability overrides keyed by class name.
    #[serde(default)]
    pub capabilities: BTreeMap<String, Capabilities>,
}

impl ConfigFile {
    /// Parse a config file from YAML.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config: ConfigFile = serde_yaml::from_str(&content)?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Look for a config file in the current directory.
    pub fn discover() -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }

    fn rebase(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        [
            &mut self.include_dir,
            &mut self.cache_dir,
            &mut self.umbrella_header,
            &mut self.libclang_dir,
        ]
        .into_iter()
        .flatten()
        .for_each(rebase);
        self.sources.iter_mut().for_each(rebase);
    }
}

/// Platform cache directory for call-map artifacts.
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "apicov")
        .map(|d| d.cache_dir().join("calls"))
        .unwrap_or_else(|| PathBuf::from(".").join(".apicov_cache"))
}

/// Collect C sources under `root`, sorted, skipping hidden directories.
fn collect_sources(root: &Path) -> Result<Vec<PathBuf>, CoverageError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let hidden = e.file_name().to_string_lossy().starts_with('.');
            !(e.depth() > 0 && e.file_type().is_dir() && hidden)
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry.path().extension().and_then(|e| e.to_str()).unwrap_or("");
        if SOURCE_EXTENSIONS.contains(&ext) {
            files.push(entry.path().canonicalize()?);
        }
    }

    files.sort();
    Ok(files)
}
