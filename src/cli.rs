//! Command-line interface for apicov.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::analyzer::Analyzer;
use crate::cache::CallCache;
use crate::capabilities::CapabilityTable;
use crate::config::{self, AnalysisConfig, ConfigFile, INCLUDE_DIR_ENV};
use crate::coverage;
use crate::error::CoverageError;
use crate::frontend::Frontend;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Separates compiler flags from source files on the command line.
const SOURCES_SEPARATOR: &str = "--";

/// API coverage auditor for C binding layers.
///
/// Parses a library's public headers and the binding sources that wrap it,
/// then reports which library functions the bindings actually call.
#[derive(Parser)]
#[command(name = "apicov")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report which library functions the binding sources call
    #[command(visible_alias = "check")]
    Scan(ScanArgs),
    /// Print the per-class capability table inferred from the headers
    Capabilities(CapabilitiesArgs),
    /// Remove cached call maps
    Clean(CleanArgs),
    /// Create an apicov.yaml config file from a template
    Init(InitArgs),
}

/// Options locating the library under audit.
#[derive(Args, Debug, Default)]
pub struct LibraryArgs {
    /// Directory holding the library's public headers
    #[arg(long, env = INCLUDE_DIR_ENV)]
    pub include_dir: Option<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Header parsed to discover the library's functions
    #[arg(long)]
    pub umbrella: Option<PathBuf>,

    /// Glob selecting the library's headers, relative to the include directory
    #[arg(long)]
    pub header_glob: Option<String>,

    /// Directory to look for libclang in first
    #[arg(long)]
    pub libclang_dir: Option<PathBuf>,
}

/// Arguments for the scan command.
///
/// Options must come before the compiler flags: everything from the first
/// flag or source on is passed through.
#[derive(Parser)]
pub struct ScanArgs {
    #[command(flatten)]
    pub library: LibraryArgs,

    /// Directory holding cached call maps
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Skip sources with compiler errors instead of aborting
    #[arg(long)]
    pub keep_going: bool,

    /// Neither read nor write cached call maps
    #[arg(long)]
    pub no_cache: bool,

    /// Output format: pretty or json
    #[arg(long, default_value = "pretty")]
    pub format: String,

    /// Compiler flags, then `--`, then source files or directories
    #[arg(
        value_name = "FLAGS -- SOURCES",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Arguments for the capabilities command.
#[derive(Parser)]
pub struct CapabilitiesArgs {
    #[command(flatten)]
    pub library: LibraryArgs,

    /// Output format: pretty or json
    #[arg(long, default_value = "pretty")]
    pub format: String,

    /// Compiler flags used to parse the headers
    #[arg(value_name = "FLAGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub flags: Vec<String>,
}

/// Arguments for the clean command.
#[derive(Parser)]
pub struct CleanArgs {
    /// Directory holding cached call maps
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "apicov.yaml")]
    pub output: PathBuf,
}

/// Commented config file written by `apicov init`.
const CONFIG_TEMPLATE: &str = include_str!("templates/apicov.yaml");

/// Split the trailing arguments into compiler flags and sources.
///
/// With a `--` separator, everything before it is a flag and everything after
/// it a source. Without one, hyphen-prefixed tokens are flags and the rest are
/// sources.
pub fn split_invocation(args: &[String]) -> (Vec<String>, Vec<PathBuf>) {
    match args.iter().position(|a| a == SOURCES_SEPARATOR) {
        Some(at) => (
            args[..at].to_vec(),
            args[at + 1..].iter().map(PathBuf::from).collect(),
        ),
        None => {
            let (flags, sources): (Vec<&String>, Vec<&String>) =
                args.iter().partition(|a| a.starts_with('-'));
            (
                flags.into_iter().cloned().collect(),
                sources.into_iter().map(PathBuf::from).collect(),
            )
        }
    }
}

/// Load the config file named on the command line, or a discovered one.
fn load_config_file(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match path.map(Path::to_path_buf).or_else(ConfigFile::discover) {
        Some(path) => {
            tracing::debug!("using config file {}", path.display());
            ConfigFile::parse_file(&path).map_err(|e| {
                anyhow::Error::from(CoverageError::Config(format!(
                    "invalid config file {}: {}",
                    path.display(),
                    e
                )))
            })
        }
        None => Ok(ConfigFile::default()),
    }
}

/// Merge library options over a config file.
///
/// Command-line values (and the environment, through clap) take precedence
/// over the file; anything left unset falls back to the defaults.
pub fn resolve_config(
    library: &LibraryArgs,
    file: &ConfigFile,
) -> Result<AnalysisConfig, CoverageError> {
    let include_dir = library
        .include_dir
        .clone()
        .or_else(|| file.include_dir.clone())
        .ok_or_else(|| {
            CoverageError::Config(format!(
                "no include directory given (use --include-dir, {} or include_dir in the config file)",
                INCLUDE_DIR_ENV
            ))
        })?;

    let mut config = AnalysisConfig::new(include_dir);
    config.compiler_flags = file.compiler_flags.clone();
    config.source_files = file.sources.clone();
    config.umbrella_header = library
        .umbrella
        .clone()
        .or_else(|| file.umbrella_header.clone());
    if let Some(glob) = library.header_glob.clone().or_else(|| file.header_glob.clone()) {
        config.header_glob = glob;
    }
    config.libclang_dir = library
        .libclang_dir
        .clone()
        .or_else(|| file.libclang_dir.clone());
    if let Some(dir) = &file.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(strict) = file.strict {
        config.strict = strict;
    }
    if let Some(cache) = file.cache {
        config.use_cache = cache;
    }

    Ok(config)
}

fn validate_format(format: &str) -> bool {
    if format == "pretty" || format == "json" {
        return true;
    }
    eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", format);
    false
}

fn load_frontend(config: &AnalysisConfig) -> Result<Frontend, CoverageError> {
    let frontend = Frontend::load(config.libclang_dir.as_deref())?;
    tracing::debug!("using libclang at {}", frontend.library().display());
    Ok(frontend)
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    let file = load_config_file(args.library.config.as_deref())?;
    let mut config = resolve_config(&args.library, &file)?;

    // Flags from the command line go after the file's so they win in clang.
    let (flags, sources) = split_invocation(&args.args);
    config.compiler_flags.extend(flags);
    if !sources.is_empty() {
        config.source_files = sources;
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = dir.clone();
    }
    if args.keep_going {
        config.strict = false;
    }
    if args.no_cache {
        config.use_cache = false;
    }

    let config = config.normalized()?;
    if config.source_files.is_empty() {
        tracing::warn!("no source files to analyze");
    }

    let frontend = load_frontend(&config)?;
    let analysis = match Analyzer::new(&frontend, &config).run() {
        Ok(analysis) => analysis,
        Err(e) if e.is_diagnostic() => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_FAILED);
        }
        Err(e) => return Err(e.into()),
    };

    let report = coverage::compute(&analysis.definitions, &analysis.calls);
    match args.format.as_str() {
        "json" => report::write_json(&report)?,
        _ => report::write_pretty(&report),
    }

    if !analysis.is_clean() {
        tracing::warn!(
            "{} source file(s) skipped because of compiler errors",
            analysis.failed.len()
        );
        return Ok(EXIT_FAILED);
    }
    Ok(EXIT_SUCCESS)
}

/// Run the capabilities command.
pub fn run_capabilities(args: &CapabilitiesArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    let file = load_config_file(args.library.config.as_deref())?;
    let mut config = resolve_config(&args.library, &file)?;
    config.compiler_flags.extend(args.flags.iter().cloned());
    config.source_files.clear();
    let config = config.normalized()?;

    let frontend = load_frontend(&config)?;
    let definitions = match Analyzer::new(&frontend, &config).scan_definitions() {
        Ok(definitions) => definitions,
        Err(e) if e.is_diagnostic() => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_FAILED);
        }
        Err(e) => return Err(e.into()),
    };

    let mut table = CapabilityTable::infer(&definitions);
    table.apply_overrides(&file.capabilities);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&table)?),
        _ => print!("{}", report::render_capabilities(&table)),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the clean command.
pub fn run_clean(args: &CleanArgs) -> anyhow::Result<i32> {
    let file = load_config_file(args.config.as_deref())?;
    let dir = args
        .cache_dir
        .clone()
        .or(file.cache_dir)
        .unwrap_or_else(config::default_cache_dir);

    if !dir.is_dir() {
        println!("Nothing to clean in {}", dir.display());
        return Ok(EXIT_SUCCESS);
    }

    let cache = CallCache::new(&dir)?;
    let removed = cache.clear()?;
    println!("Removed {} cached call map(s) from {}", removed, cache.dir().display());
    Ok(EXIT_SUCCESS)
}

/// Run the init command. An existing file is left alone.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    match write_template(&args.output) {
        Ok(()) => {
            println!(
                "Wrote {}. Fill in include_dir and sources, then run `apicov scan --config {}`.",
                args.output.display(),
                args.output.display()
            );
            Ok(EXIT_SUCCESS)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            eprintln!("Error: {} already exists, not overwriting it", args.output.display());
            Ok(EXIT_ERROR)
        }
        Err(e) => Err(e.into()),
    }
}

fn write_template(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?
        .write_all(CONFIG_TEMPLATE.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_on_separator() {
        let (flags, sources) =
            split_invocation(&strings(&["-I/usr/include", "-DX=1", "--", "a.c", "-odd.c"]));
        assert_eq!(flags, strings(&["-I/usr/include", "-DX=1"]));
        assert_eq!(sources, vec![PathBuf::from("a.c"), PathBuf::from("-odd.c")]);
    }

    #[test]
    fn test_split_without_separator() {
        let (flags, sources) = split_invocation(&strings(&["a.c", "-Iinc", "src", "-std=c99"]));
        assert_eq!(flags, strings(&["-Iinc", "-std=c99"]));
        assert_eq!(sources, vec![PathBuf::from("a.c"), PathBuf::from("src")]);
    }

    #[test]
    fn test_split_empty() {
        let (flags, sources) = split_invocation(&[]);
        assert!(flags.is_empty());
        assert!(sources.is_empty());

        let (flags, sources) = split_invocation(&strings(&["--"]));
        assert!(flags.is_empty());
        assert!(sources.is_empty());
    }

    #[test]
    fn test_parse_scan_invocation() {
        let cli = Cli::try_parse_from([
            "apicov",
            "scan",
            "--include-dir",
            "inc/mylib",
            "--keep-going",
            "-Iinc",
            "-DFOO",
            "--",
            "wrap.c",
        ])
        .unwrap();

        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.library.include_dir, Some(PathBuf::from("inc/mylib")));
        assert!(args.keep_going);
        assert!(!args.no_cache);
        assert_eq!(args.format, "pretty");

        let (flags, sources) = split_invocation(&args.args);
        assert_eq!(flags, strings(&["-Iinc", "-DFOO"]));
        assert_eq!(sources, vec![PathBuf::from("wrap.c")]);
    }

    #[test]
    fn test_check_alias_and_global_quiet() {
        let cli = Cli::try_parse_from(["apicov", "check", "--quiet", "wrap.c"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Scan(_)));
    }

    #[test]
    fn test_resolve_prefers_command_line() {
        let file = ConfigFile {
            include_dir: Some(PathBuf::from("/from/file")),
            header_glob: Some("**/*.h".to_string()),
            umbrella_header: Some(PathBuf::from("/from/file.h")),
            strict: Some(false),
            cache: Some(false),
            ..ConfigFile::default()
        };
        let library = LibraryArgs {
            include_dir: Some(PathBuf::from("/from/cli")),
            ..LibraryArgs::default()
        };

        let config = resolve_config(&library, &file).unwrap();

        assert_eq!(config.include_dir, PathBuf::from("/from/cli"));
        assert_eq!(config.header_glob, "**/*.h");
        assert_eq!(config.umbrella_header, Some(PathBuf::from("/from/file.h")));
        assert!(!config.strict);
        assert!(!config.use_cache);
    }

    #[test]
    fn test_resolve_requires_include_dir() {
        let err = resolve_config(&LibraryArgs::default(), &ConfigFile::default()).unwrap_err();
        assert!(matches!(err, CoverageError::Config(_)));
    }

    #[test]
    fn test_template_parses() {
        let file: ConfigFile = serde_yaml::from_str(CONFIG_TEMPLATE).unwrap();
        assert!(file.include_dir.is_some());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("conf").join("apicov.yaml");
        let args = InitArgs {
            output: output.clone(),
        };

        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(fs::read_to_string(&output).unwrap(), CONFIG_TEMPLATE);

        fs::write(&output, "include_dir: mine\n").unwrap();
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
        assert_eq!(fs::read_to_string(&output).unwrap(), "include_dir: mine\n");
    }

    #[test]
    fn test_clean_removes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".wrap.c.cache"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let args = CleanArgs {
            cache_dir: Some(dir.path().to_path_buf()),
            config: None,
        };

        assert_eq!(run_clean(&args).unwrap(), EXIT_SUCCESS);
        assert!(!dir.path().join(".wrap.c.cache").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_clean_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let args = CleanArgs {
            cache_dir: Some(dir.path().join("never-created")),
            config: Some(dir.path().join("none.yaml")),
        };
        // An explicit config path that does not exist is an error.
        assert!(run_clean(&args).is_err());

        let args = CleanArgs {
            cache_dir: Some(dir.path().join("never-created")),
            config: None,
        };
        assert_eq!(run_clean(&args).unwrap(), EXIT_SUCCESS);
    }
}
