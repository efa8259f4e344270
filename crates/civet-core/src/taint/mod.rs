//! Symbolic taint engine for command-injection analysis.
//!
//! One [`InjectionAnalyzer`] checks one parsed file per call: it walks the
//! AST once, maintaining a path-scoped constraint [`formula`] that mirrors
//! control flow, and at every cataloged process-spawning call asks the
//! string solver whether an injection payload can reach the assembled
//! command line. A satisfying assignment is mapped back to the source-level
//! variable it taints and reported as an [`InjectionFinding`].

pub mod formula;
mod scanner;
pub mod sinks;
pub mod solver;
pub mod symbol;

pub use formula::{ClauseId, Formula, FormulaScope};
pub use sinks::{SinkRegistry, SinkStyle};
pub use solver::{Assignment, Solution, SolverError, StringSolver, Z3StrSolver};
pub use symbol::{Constraint, SymbolicExpr};

use swc_common::Span;

use crate::config::InjectionConfig;
use crate::parser::ParsedFile;
use crate::visitor::{VisitorContext, walk_ast};
use scanner::InjectionScanner;

/// Name of the synthetic variable each query binds to the vector's value.
pub const VECTOR_NAME: &str = "vector";

/// Payload substrings whose presence in a command line constitutes an
/// injection. The leading `;` terminates whatever command precedes it.
pub const DEFAULT_PAYLOADS: &[&str] = &[";a"];

/// Fatal conditions for the analysis of one file.
///
/// Unsupported constructs stop the file instead of being approximated away:
/// a silent mistranslation would show up as a clean report over code the
/// engine did not actually understand.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unsupported {context}: {kind}")]
    UnsupportedConstruct { context: &'static str, kind: String },
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl EngineError {
    pub fn unsupported(context: &'static str, kind: impl Into<String>) -> Self {
        EngineError::UnsupportedConstruct {
            context,
            kind: kind.into(),
        }
    }
}

/// One confirmed injection at a dangerous call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionFinding {
    /// Rendered callee, e.g. `child_process.execSync`.
    pub callee: String,
    /// The source-level variable the solver assigned a payload to.
    pub variable: String,
    /// The concrete value from the solver's counter-example.
    pub value: String,
    /// Call-site span.
    pub span: Span,
}

impl InjectionFinding {
    pub fn message(&self) -> String {
        format!(
            "unsafe {} call; {} can be \"{}\"",
            self.callee, self.variable, self.value
        )
    }
}

pub struct InjectionAnalyzer {
    sinks: SinkRegistry,
    payloads: Vec<String>,
    solver: Box<dyn StringSolver>,
}

impl InjectionAnalyzer {
    /// Built-in sinks and payloads, querying z3. The solver binary is only
    /// needed at query time; without it every query fails open.
    pub fn new() -> Self {
        Self::with_parts(
            SinkRegistry::with_defaults(),
            DEFAULT_PAYLOADS.iter().map(|p| p.to_string()).collect(),
            Box::new(Z3StrSolver::new()),
        )
    }

    pub fn with_parts(
        sinks: SinkRegistry,
        payloads: Vec<String>,
        solver: Box<dyn StringSolver>,
    ) -> Self {
        Self {
            sinks,
            payloads,
            solver,
        }
    }

    /// Defaults extended by `[injection]` configuration: extra sinks, extra
    /// payloads, and the solver timeout.
    pub fn from_config(config: &InjectionConfig) -> Self {
        let mut sinks = SinkRegistry::with_defaults();
        for (callee, style) in &config.sinks {
            sinks.register(callee, *style);
        }

        let mut payloads: Vec<String> =
            DEFAULT_PAYLOADS.iter().map(|p| p.to_string()).collect();
        for payload in &config.payloads {
            if !payloads.iter().any(|existing| existing == payload) {
                payloads.push(payload.clone());
            }
        }

        let solver = match config.solver_timeout_ms {
            Some(timeout) => Z3StrSolver::with_timeout(timeout),
            None => Z3StrSolver::new(),
        };

        Self::with_parts(sinks, payloads, Box::new(solver))
    }

    pub fn sinks(&self) -> &SinkRegistry {
        &self.sinks
    }

    /// Analyze one file. `Ok` carries the findings (commonly empty); `Err`
    /// means the file used a construct the engine does not model and its
    /// analysis was aborted.
    pub fn analyze(&self, file: &ParsedFile) -> Result<Vec<InjectionFinding>, EngineError> {
        let Some(module) = file.module() else {
            return Ok(Vec::new());
        };

        tracing::trace!(file = %file.metadata().filename, "injection analysis start");

        let ctx = VisitorContext::new(file);
        let mut scanner = InjectionScanner::new(&self.sinks, &self.payloads, self.solver.as_ref());
        walk_ast(module, &mut scanner, &ctx);
        scanner.into_result()
    }
}

impl Default for InjectionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
