//! Bridge to the external string-constraint solver.
//!
//! The engine only ever sees the [`StringSolver`] trait: a serialized
//! formula goes in, and either "unsatisfiable" or a set of concrete
//! variable assignments comes out. Everything else about the solver —
//! which binary, which theories, how models are printed — stays behind
//! this boundary, so tests can substitute a scripted implementation.
//!
//! [`Z3StrSolver`] drives a `z3` child process over SMT-LIB2 on
//! stdin/stdout. Queries are bounded both by the solver-side `:timeout`
//! option and by a hard `-T` wall-clock limit, and a timeout surfaces as an
//! ordinary [`SolverError`] (callers treat every solver failure as
//! "unsatisfiable").

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use regex::Regex;

/// One (variable, concrete value) pair from a satisfying model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub value: String,
}

/// Outcome of a satisfiability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    Unsat,
    Sat(Vec<Assignment>),
}

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("failed to launch solver process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("solver i/o failed: {0}")]
    Io(#[source] std::io::Error),
    #[error("solver gave up: {0}")]
    Unknown(String),
    #[error("solver returned malformed output: {0}")]
    Malformed(String),
}

pub trait StringSolver: Send + Sync {
    fn solve(&self, query: &str) -> Result<Solution, SolverError>;

    fn name(&self) -> &'static str;
}

/// Z3 with its sequence/string theory, driven as a child process.
#[derive(Debug, Clone)]
pub struct Z3StrSolver {
    timeout_ms: u64,
}

impl Z3StrSolver {
    pub fn new() -> Self {
        Self { timeout_ms: 5000 }
    }

    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    /// Whether a `z3` binary is on PATH.
    pub fn is_available() -> bool {
        Command::new("z3")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn script(&self, query: &str) -> String {
        let mut script = String::new();
        script.push_str("(set-option :produce-models true)\n");
        script.push_str(&format!("(set-option :timeout {})\n", self.timeout_ms));
        script.push_str(query);
        script.push_str("(exit)\n");
        script
    }

    fn run(&self, script: &str) -> Result<String, SolverError> {
        // Hard wall-clock backstop one second past the soft :timeout.
        let hard_limit_secs = self.timeout_ms.div_ceil(1000) + 1;

        let mut child = Command::new("z3")
            .arg("-in")
            .arg("-smt2")
            .arg(format!("-T:{hard_limit_secs}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SolverError::Spawn)?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(script.as_bytes())
                .map_err(SolverError::Io)?;
        }
        drop(child.stdin.take());

        let output = child.wait_with_output().map_err(SolverError::Io)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn parse_output(&self, output: &str) -> Result<Solution, SolverError> {
        let verdict = output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");

        match verdict {
            "unsat" => Ok(Solution::Unsat),
            "sat" => Ok(Solution::Sat(parse_model(output))),
            "unknown" | "timeout" => Err(SolverError::Unknown(verdict.to_string())),
            other => Err(SolverError::Malformed(other.to_string())),
        }
    }
}

impl Default for Z3StrSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StringSolver for Z3StrSolver {
    fn solve(&self, query: &str) -> Result<Solution, SolverError> {
        let script = self.script(query);
        tracing::trace!(solver = self.name(), query = %script, "solver query");
        let output = self.run(&script)?;
        self.parse_output(&output)
    }

    fn name(&self) -> &'static str {
        "z3"
    }
}

/// Extract String-sorted `define-fun` assignments from a model, in the order
/// the solver printed them. Models may wrap the value onto its own line, so
/// the pattern spans newlines.
fn parse_model(output: &str) -> Vec<Assignment> {
    static DEFINE_FUN: OnceLock<Regex> = OnceLock::new();
    let re = DEFINE_FUN.get_or_init(|| {
        Regex::new(
            r#"(?s)\(define-fun\s+(\|[^|]*\||[^\s()]+)\s+\(\)\s+String\s+"((?:[^"]|"")*)""#,
        )
        .expect("model pattern is valid")
    });

    re.captures_iter(output)
        .map(|caps| Assignment {
            name: caps[1].trim_matches('|').to_string(),
            value: caps[2].replace("\"\"", "\""),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver() -> Z3StrSolver {
        Z3StrSolver::with_timeout(2000)
    }

    #[test]
    fn parses_unsat_verdict() {
        let solution = solver().parse_output("unsat\n").unwrap();
        assert_eq!(solution, Solution::Unsat);
    }

    #[test]
    fn parses_sat_with_single_line_model() {
        let output = "sat\n(\n  (define-fun tainted () String \";a\")\n)\n";

        let solution = solver().parse_output(output).unwrap();

        assert_eq!(
            solution,
            Solution::Sat(vec![Assignment {
                name: "tainted".to_string(),
                value: ";a".to_string(),
            }])
        );
    }

    #[test]
    fn parses_sat_with_wrapped_model_lines() {
        let output = r#"sat
(
  (define-fun vector () String
    "echo ;a")
  (define-fun tainted () String
    ";a")
)
"#;

        let solution = solver().parse_output(output).unwrap();

        let Solution::Sat(assignments) = solution else {
            panic!("expected sat");
        };
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].name, "vector");
        assert_eq!(assignments[0].value, "echo ;a");
        assert_eq!(assignments[1].name, "tainted");
    }

    #[test]
    fn strips_pipe_quoting_from_symbol_names() {
        let output = "sat\n((define-fun |req.body.cmd one| () String \";a\"))\n";

        let Solution::Sat(assignments) = solver().parse_output(output).unwrap() else {
            panic!("expected sat");
        };
        assert_eq!(assignments[0].name, "req.body.cmd one");
    }

    #[test]
    fn unescapes_doubled_quotes_in_values() {
        let output = "sat\n((define-fun x () String \"say \"\"hi\"\"\"))\n";

        let Solution::Sat(assignments) = solver().parse_output(output).unwrap() else {
            panic!("expected sat");
        };
        assert_eq!(assignments[0].value, "say \"hi\"");
    }

    #[test]
    fn unknown_is_a_solver_error() {
        assert!(matches!(
            solver().parse_output("unknown\n"),
            Err(SolverError::Unknown(_))
        ));
    }

    #[test]
    fn error_output_is_malformed() {
        assert!(matches!(
            solver().parse_output("(error \"line 3: unknown sort\")\n"),
            Err(SolverError::Malformed(_))
        ));
    }

    #[test]
    fn ignores_non_string_sorted_assignments() {
        let output = "sat\n((define-fun n () Int 3)\n (define-fun s () String \"x\"))\n";

        let Solution::Sat(assignments) = solver().parse_output(output).unwrap() else {
            panic!("expected sat");
        };
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].name, "s");
    }

    // Exercises the real binary; a no-op on machines without z3.
    #[test]
    fn solves_a_trivial_containment_query() {
        if !Z3StrSolver::is_available() {
            return;
        }

        let query = "(declare-const x String)\n\
                     (assert (str.contains x \";a\"))\n\
                     (check-sat)\n(get-model)\n";

        let solution = solver().solve(query).unwrap();

        let Solution::Sat(assignments) = solution else {
            panic!("expected sat");
        };
        let x = assignments.iter().find(|a| a.name == "x").unwrap();
        assert!(x.value.contains(";a"));
    }

    #[test]
    fn reports_unsat_for_constant_mismatch() {
        if !Z3StrSolver::is_available() {
            return;
        }

        let query = "(declare-const x String)\n\
                     (assert (= x \"echo\"))\n\
                     (assert (str.contains x \";a\"))\n\
                     (check-sat)\n(get-model)\n";

        assert_eq!(solver().solve(query).unwrap(), Solution::Unsat);
    }
}
