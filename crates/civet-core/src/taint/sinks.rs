//! Registry of process-spawning calls and their injection-relevant arguments.
//!
//! Each dangerous callee maps to an extraction style describing which
//! argument positions ("vectors") can carry attacker-controlled data into
//! the spawned command line. The table is plain data: the engine receives a
//! registry at construction time and configuration may extend it with
//! project-specific sinks.

use std::collections::HashMap;

use serde::Deserialize;
use swc_ecma_ast::{Expr, ExprOrSpread};

use super::EngineError;

/// How a dangerous call exposes its vectors, by arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkStyle {
    /// `exec("cmd")` — one command-line string; the first argument is the
    /// only vector, extra arguments (options, callback) are not.
    Exec,
    /// `spawn(cmd, [args])` — the first argument plus, when the second
    /// argument is a literal array, each of its elements.
    Spawn,
}

impl SinkStyle {
    /// The injection-relevant argument expressions of a call with this
    /// style, in the order they are checked.
    pub fn extract_vectors<'a>(
        &self,
        args: &'a [ExprOrSpread],
    ) -> Result<Vec<&'a Expr>, EngineError> {
        let mut vectors = Vec::new();

        match self {
            SinkStyle::Exec => {
                if let Some(first) = args.first() {
                    vectors.push(vector_expr(first)?);
                }
            }
            SinkStyle::Spawn => {
                if args.len() >= 2 {
                    if let Expr::Array(array) = &*args[1].expr {
                        for element in array.elems.iter().flatten() {
                            vectors.push(vector_expr(element)?);
                        }
                    }
                }
                if let Some(first) = args.first() {
                    vectors.push(vector_expr(first)?);
                }
            }
        }

        Ok(vectors)
    }
}

fn vector_expr(arg: &ExprOrSpread) -> Result<&Expr, EngineError> {
    if arg.spread.is_some() {
        return Err(EngineError::unsupported(
            "extracting vector from argument",
            "SpreadElement",
        ));
    }
    Ok(&arg.expr)
}

#[derive(Debug, Clone)]
pub struct SinkRegistry {
    sinks: HashMap<String, SinkStyle>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self {
            sinks: HashMap::new(),
        }
    }

    /// The built-in table: the shell-execution and subprocess spawn family.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("shelljs.exec", SinkStyle::Exec);
        registry.register("child_process.exec", SinkStyle::Exec);
        registry.register("child_process.execSync", SinkStyle::Exec);
        registry.register("child_process.spawn", SinkStyle::Spawn);
        registry.register("child_process.spawnSync", SinkStyle::Spawn);
        registry
    }

    pub fn register(&mut self, callee: &str, style: SinkStyle) {
        self.sinks.insert(callee.to_string(), style);
    }

    pub fn is_dangerous(&self, callee: &str) -> bool {
        self.sinks.contains_key(callee)
    }

    pub fn style(&self, callee: &str) -> Option<SinkStyle> {
        self.sinks.get(callee).copied()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
