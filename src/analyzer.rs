//! End-to-end coverage run over a library and its binding sources.

use clang::Index;
use std::path::{Path, PathBuf};

use crate::ast::{walk, FileSet};
use crate::cache::CallCache;
use crate::calls::{aggregate, extract_calls, CallMap};
use crate::config::AnalysisConfig;
use crate::definitions::{collect_definitions, list_headers, sibling_umbrella, DefinitionSet};
use crate::error::CoverageError;
use crate::frontend::{self, DiagnosticSummary, Frontend};

/// Result of a run.
#[derive(Debug)]
pub struct Analysis {
    pub definitions: DefinitionSet,
    pub calls: CallMap,
    /// Sources skipped because of error diagnostics (non-strict runs only).
    pub failed: Vec<PathBuf>,
}

impl Analysis {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the definition scan and the per-source call extraction.
///
/// Translation units are parsed one at a time on the calling thread.
pub struct Analyzer<'c> {
    index: Index<'c>,
    config: &'c AnalysisConfig,
}

impl<'c> Analyzer<'c> {
    /// `config` is expected to be [normalized](AnalysisConfig::normalized).
    pub fn new(frontend: &'c Frontend, config: &'c AnalysisConfig) -> Self {
        Self {
            index: frontend.index(),
            config,
        }
    }

    /// Scan definitions, then every source, and aggregate the calls.
    pub fn run(&self) -> Result<Analysis, CoverageError> {
        let definitions = self.scan_definitions()?;
        tracing::info!(
            "found {} library functions under {}",
            definitions.len(),
            self.config.include_dir.display()
        );

        let cache = if self.config.use_cache {
            CallCache::new(&self.config.cache_dir)?
                .keyed(&self.config.include_dir, &self.config.compiler_flags)
        } else {
            CallCache::disabled()
        };

        let (per_file, failed) = self.scan_sources(&cache)?;

        Ok(Analysis {
            definitions,
            calls: aggregate(per_file),
            failed,
        })
    }

    /// Collect every function declared in the library headers.
    ///
    /// Error diagnostics here are always fatal: without a complete set of
    /// definitions there is nothing meaningful to report.
    pub fn scan_definitions(&self) -> Result<DefinitionSet, CoverageError> {
        let config = self.config;
        let headers = list_headers(&config.include_dir, &config.header_glob)?;
        let files = FileSet::new(headers.iter().cloned());

        let entry_points = match config
            .umbrella_header
            .clone()
            .or_else(|| sibling_umbrella(&config.include_dir))
        {
            Some(umbrella) => vec![umbrella],
            None => headers,
        };

        let mut definitions = DefinitionSet::new();
        for header in &entry_points {
            tracing::debug!("scanning declarations in {}", header.display());
            let unit = frontend::parse(&self.index, header, &config.compiler_flags, true)?;
            log_warnings(header, frontend::check_diagnostics(&unit, header)?);
            definitions.extend(collect_definitions(walk(frontend::roots(&unit), &files)));
        }

        Ok(definitions)
    }

    /// Extract (or load from cache) the call map of every source.
    ///
    /// Returns the per-file maps in source order and the sources skipped
    /// because of error diagnostics.
    pub fn scan_sources(
        &self,
        cache: &CallCache,
    ) -> Result<(Vec<CallMap>, Vec<PathBuf>), CoverageError> {
        let sources = FileSet::new(self.config.source_files.iter().cloned());
        let mut per_file = Vec::with_capacity(self.config.source_files.len());
        let mut failed = Vec::new();

        for source in &self.config.source_files {
            tracing::info!("processing {}", source.display());

            match cache.load_or_build(source, || self.extract_file(source, &sources)) {
                Ok(calls) => per_file.push(calls),
                Err(e) if e.is_diagnostic() && !self.config.strict => {
                    tracing::warn!("skipping {}: {}", source.display(), e);
                    failed.push(source.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok((per_file, failed))
    }

    fn extract_file(&self, source: &Path, sources: &FileSet) -> Result<CallMap, CoverageError> {
        let unit = frontend::parse(&self.index, source, &self.config.compiler_flags, false)?;
        log_warnings(source, frontend::check_diagnostics(&unit, source)?);
        Ok(extract_calls(
            walk(frontend::roots(&unit), sources),
            &self.config.include_dir,
        ))
    }
}

fn log_warnings(path: &Path, summary: DiagnosticSummary) {
    if summary.warnings > 0 {
        tracing::debug!("{}: {} warning(s)", path.display(), summary.warnings);
    }
}
