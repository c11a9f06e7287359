//! apicov - API coverage auditor for C binding layers.
//!
//! apicov answers one question about a binding layer written in C: which of
//! the wrapped library's public functions does it actually call? Both the
//! library headers and the binding sources are parsed with libclang; calls
//! that resolve to a declaration under the library's include directory are
//! matched against the functions declared there.
//!
//! # Architecture
//!
//! - `frontend`: libclang discovery, loading and parsing
//! - `ast`: the `Cursor` abstraction and the breadth-first walker
//! - `calls`: call extraction and aggregation
//! - `definitions`: the library's declared functions
//! - `cache`: per-source call maps persisted between runs
//! - `coverage`: used/unused partition and percentages
//! - `capabilities`: per-class capability table for binding generators
//! - `report`: output formatting (text, JSON)
//! - `analyzer`: a complete run tying the above together

pub mod analyzer;
pub mod ast;
pub mod cache;
pub mod calls;
pub mod capabilities;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod definitions;
pub mod error;
pub mod frontend;
pub mod report;

pub use analyzer::{Analysis, Analyzer};
pub use ast::{walk, Cursor, CursorKind, FileSet, Span};
pub use cache::CallCache;
pub use calls::{aggregate, extract_calls, Call, CallMap};
pub use capabilities::{Capabilities, CapabilityTable};
pub use config::{AnalysisConfig, ConfigFile};
pub use coverage::{compute, CoverageReport};
pub use definitions::{collect_definitions, Definition, DefinitionSet};
pub use error::CoverageError;
pub use frontend::Frontend;
