//! Core analysis engine for Civet.
//!
//! Civet analyzes JavaScript/TypeScript sources for command-injection
//! vulnerabilities. Instead of pattern-matching on dangerous calls, it builds
//! a path-scoped symbolic formula over the string values flowing into each
//! process-spawning call and asks an external string-constraint solver
//! whether an injection payload can reach the assembled command line.
//!
//! The crate is organized like a conventional linter:
//!
//! - [`parser`] wraps swc and produces a [`parser::ParsedFile`] per source.
//! - [`visitor`] provides enter/leave AST traversal with parent-aware block
//!   events.
//! - [`taint`] holds the symbolic engine: expression translation, the scoped
//!   formula, the dangerous-call catalog, the solver bridge, and the scanner
//!   that ties them together during one traversal pass.
//! - [`rules`] and [`analysis`] expose the engine through a rule registry so
//!   diagnostics flow to consumers the same way for every rule.

pub mod analysis;
pub mod config;
pub mod diagnostic;
pub mod parser;
pub mod rules;
pub mod taint;
pub mod visitor;

pub use analysis::AnalysisEngine;
pub use diagnostic::Diagnostic;
pub use parser::ParsedFile;
