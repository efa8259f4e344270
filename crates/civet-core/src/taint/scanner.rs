//! Single-pass scanner: drives the formula's scopes from traversal events
//! and runs the injection search at every dangerous call site.
//!
//! The formula mirrors control flow: function bodies push a scope and
//! declare their parameters as unconstrained (attacker-controllable)
//! strings, if-branches push a scope asserting the branch condition or its
//! negation, and loop bodies are deliberately not modeled. Blocks under any
//! other construct are a hard failure — the scanner never guesses.

use std::ops::ControlFlow;

use swc_common::Spanned;
use swc_ecma_ast::{
    ArrowExpr, BlockStmt, CallExpr, Callee, Expr, FnDecl, Function, Pat, VarDeclarator,
};

use super::formula::Formula;
use super::sinks::SinkRegistry;
use super::solver::{Assignment, Solution, StringSolver};
use super::symbol::{self, Constraint, SymbolicExpr};
use super::{EngineError, InjectionFinding, VECTOR_NAME};
use crate::visitor::{AstVisitor, BlockContext, VisitorContext};

pub(crate) struct InjectionScanner<'a> {
    formula: Formula,
    sinks: &'a SinkRegistry,
    payloads: &'a [String],
    solver: &'a dyn StringSolver,
    findings: Vec<InjectionFinding>,
    error: Option<EngineError>,
}

impl<'a> InjectionScanner<'a> {
    pub(crate) fn new(
        sinks: &'a SinkRegistry,
        payloads: &'a [String],
        solver: &'a dyn StringSolver,
    ) -> Self {
        Self {
            formula: Formula::new(),
            sinks,
            payloads,
            solver,
            findings: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn into_result(self) -> Result<Vec<InjectionFinding>, EngineError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.findings),
        }
    }

    fn fail(&mut self, error: EngineError) -> ControlFlow<()> {
        tracing::debug!(%error, "aborting analysis of this file");
        self.error = Some(error);
        ControlFlow::Break(())
    }

    fn declare_param(&mut self, pat: &Pat) -> Result<(), EngineError> {
        match pat {
            Pat::Ident(ident) => {
                self.formula.declare(ident.id.sym.as_str());
                Ok(())
            }
            other => Err(EngineError::unsupported(
                "declaring parameter pattern",
                pat_kind(other),
            )),
        }
    }

    /// Ask whether any known payload can appear in the vector's value under
    /// the current path constraints. Returns the satisfying assignment for a
    /// variable the vector references, or `None` when every payload query is
    /// unsatisfiable (solver failures count as unsatisfiable).
    fn find_injection(
        &mut self,
        vector: &Expr,
        ctx: &VisitorContext,
    ) -> Result<Option<Assignment>, EngineError> {
        let names = symbol::used_names(vector, ctx)?;
        let value = symbol::translate(vector, ctx)?;

        let payloads = self.payloads;
        let solver = self.solver;

        // The guard pops the query scope on every exit path, including the
        // inconsistency error below.
        let mut scope = self.formula.scoped();
        scope.declare(VECTOR_NAME);
        scope.bind(VECTOR_NAME, &value);

        for payload in payloads {
            let clause = scope.assert_constraint(&Constraint::contains(
                SymbolicExpr::var(VECTOR_NAME),
                SymbolicExpr::constant(payload.as_str()),
            ));
            let solution = evaluate(&mut scope, solver);
            scope.retract(clause);

            let Some(assignments) = solution else {
                continue;
            };

            let hit = assignments
                .into_iter()
                .find(|a| names.iter().any(|name| name == scope.source_name(&a.name)));
            return match hit {
                Some(assignment) => Ok(Some(assignment)),
                // SAT was only possible because some vector-referenced
                // variable carries the payload, so its absence means the
                // translation and the model disagree about naming.
                None => Err(EngineError::InternalInconsistency(
                    "satisfiable query assigned no variable referenced by the vector".to_string(),
                )),
            };
        }

        Ok(None)
    }

    fn check_call(&mut self, node: &CallExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        let Callee::Expr(callee) = &node.callee else {
            return ControlFlow::Continue(());
        };
        let Some(callee_name) = ctx.get_source_text(callee.span()) else {
            return ControlFlow::Continue(());
        };
        let Some(style) = self.sinks.style(callee_name) else {
            return ControlFlow::Continue(());
        };
        let callee_name = callee_name.to_string();

        tracing::trace!(callee = %callee_name, "checking dangerous call");

        let vectors = match style.extract_vectors(&node.args) {
            Ok(vectors) => vectors,
            Err(error) => return self.fail(error),
        };

        for vector in vectors {
            match self.find_injection(vector, ctx) {
                Ok(Some(assignment)) => {
                    tracing::trace!(
                        callee = %callee_name,
                        variable = %assignment.name,
                        "injection found"
                    );
                    self.findings.push(InjectionFinding {
                        callee: callee_name.clone(),
                        variable: self.formula.source_name(&assignment.name).to_string(),
                        value: assignment.value,
                        span: node.span,
                    });
                }
                Ok(None) => {}
                Err(error) => return self.fail(error),
            }
        }

        ControlFlow::Continue(())
    }
}

/// One solver round trip: bracket the formula with a solve request, hand the
/// serialized query to the solver, and undo the request. A failed invocation
/// is logged and treated as unsatisfiable rather than aborting the analysis.
fn evaluate(formula: &mut Formula, solver: &dyn StringSolver) -> Option<Vec<Assignment>> {
    formula.request_solve();
    let query = formula.serialize();
    let outcome = solver.solve(&query);
    formula.cancel_solve();

    match outcome {
        Ok(Solution::Sat(assignments)) => Some(assignments),
        Ok(Solution::Unsat) => None,
        Err(error) => {
            tracing::error!(
                solver = solver.name(),
                %error,
                "solver invocation failed; treating query as unsatisfiable"
            );
            None
        }
    }
}

impl AstVisitor for InjectionScanner<'_> {
    fn enter_fn_decl(&mut self, node: &FnDecl, _ctx: &VisitorContext) -> ControlFlow<()> {
        // The function's own name is visible in the enclosing scope.
        self.formula.declare(node.ident.sym.as_str());
        ControlFlow::Continue(())
    }

    fn enter_function(&mut self, node: &Function, _ctx: &VisitorContext) -> ControlFlow<()> {
        self.formula.enter_scope();
        for param in &node.params {
            if let Err(error) = self.declare_param(&param.pat) {
                return self.fail(error);
            }
        }
        ControlFlow::Continue(())
    }

    fn leave_function(&mut self, _node: &Function, _ctx: &VisitorContext) -> ControlFlow<()> {
        self.formula.exit_scope();
        ControlFlow::Continue(())
    }

    fn enter_arrow_expr(&mut self, node: &ArrowExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        self.formula.enter_scope();
        for pat in &node.params {
            if let Err(error) = self.declare_param(pat) {
                return self.fail(error);
            }
        }
        ControlFlow::Continue(())
    }

    fn leave_arrow_expr(&mut self, _node: &ArrowExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        self.formula.exit_scope();
        ControlFlow::Continue(())
    }

    fn enter_var_declarator(
        &mut self,
        node: &VarDeclarator,
        ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        let name = match &node.name {
            Pat::Ident(ident) => ident.id.sym.as_str(),
            other => {
                return self.fail(EngineError::unsupported(
                    "declaring variable pattern",
                    pat_kind(other),
                ));
            }
        };
        self.formula.declare(name);

        if let Some(init) = &node.init {
            match symbol::translate(init, ctx) {
                Ok(value) => self.formula.bind(name, &value),
                Err(error) => return self.fail(error),
            }
        }
        ControlFlow::Continue(())
    }

    fn enter_block(
        &mut self,
        _node: &BlockStmt,
        context: &BlockContext<'_>,
        ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        match context {
            // Function scopes are pushed by the function callbacks; loop
            // bodies run under no extra path condition (a documented
            // under-approximation).
            BlockContext::FunctionBody | BlockContext::LoopBody => ControlFlow::Continue(()),
            BlockContext::IfBranch { test, alternate } => {
                let condition = match symbol::translate_condition(test, ctx) {
                    Ok(condition) => condition,
                    Err(error) => return self.fail(error),
                };
                self.formula.enter_scope();
                let condition = if *alternate {
                    condition.negate()
                } else {
                    condition
                };
                self.formula.assert_constraint(&condition);
                ControlFlow::Continue(())
            }
            BlockContext::Other { parent } => self.fail(EngineError::unsupported(
                "entering block under",
                *parent,
            )),
        }
    }

    fn leave_block(
        &mut self,
        _node: &BlockStmt,
        context: &BlockContext<'_>,
        _ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        if let BlockContext::IfBranch { .. } = context {
            self.formula.exit_scope();
        }
        ControlFlow::Continue(())
    }

    fn leave_call_expr(&mut self, node: &CallExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.check_call(node, ctx)
    }
}

fn pat_kind(pat: &Pat) -> &'static str {
    match pat {
        Pat::Ident(_) => "Identifier",
        Pat::Array(_) => "ArrayPattern",
        Pat::Rest(_) => "RestElement",
        Pat::Object(_) => "ObjectPattern",
        Pat::Assign(_) => "AssignmentPattern",
        Pat::Invalid(_) => "Invalid",
        Pat::Expr(_) => "Expression",
    }
}
