//! no-dead-code rule (Q001): traversal tracing stub.
//!
//! The actual dead-code analysis is not implemented yet. What the rule does
//! do is emit a depth-indented trace event for every node kind the walker
//! dispatches, which is the instrumentation the other rules are debugged
//! against (`RUST_LOG=civet::trace=trace`).

use std::ops::ControlFlow;

use swc_common::{Span, Spanned};
use swc_ecma_ast::{
    ArrowExpr, AssignExpr, BinExpr, BlockStmt, CallExpr, FnDecl, Function, Ident, IfStmt, Lit,
    MemberExpr, NewExpr, VarDecl, VarDeclarator,
};

use crate::declare_rule;
use crate::diagnostic::Diagnostic;
use crate::parser::ParsedFile;
use crate::rules::{Rule, RuleMetadata};
use crate::visitor::{AstVisitor, BlockContext, VisitorContext, walk_ast};

declare_rule!(
    NoDeadCode,
    id = "Q001",
    name = "no-dead-code",
    description = "Detect unreachable code (placeholder; currently traces the AST traversal)",
    category = Quality,
    severity = Info
);

impl Rule for NoDeadCode {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&self, file: &ParsedFile) -> Vec<Diagnostic> {
        if let Some(module) = file.module() {
            let ctx = VisitorContext::new(file);
            let mut tracer = Tracer { depth: 0 };
            walk_ast(module, &mut tracer, &ctx);
        }
        Vec::new()
    }
}

struct Tracer {
    depth: usize,
}

impl Tracer {
    fn enter(&mut self, kind: &str, span: Span, ctx: &VisitorContext) -> ControlFlow<()> {
        self.emit('>', kind, span, ctx);
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn leave(&mut self, kind: &str, span: Span, ctx: &VisitorContext) -> ControlFlow<()> {
        self.depth = self.depth.saturating_sub(1);
        self.emit('<', kind, span, ctx);
        ControlFlow::Continue(())
    }

    fn emit(&self, direction: char, kind: &str, span: Span, ctx: &VisitorContext) {
        let snippet: String = ctx
            .get_source_text(span)
            .unwrap_or("")
            .chars()
            .take(50)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        tracing::trace!(
            target: "civet::trace",
            "{:indent$}{direction} {kind} {snippet}",
            "",
            indent = self.depth * 4
        );
    }
}

impl AstVisitor for Tracer {
    fn enter_function(&mut self, node: &Function, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("Function", node.span(), ctx)
    }

    fn leave_function(&mut self, node: &Function, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("Function", node.span(), ctx)
    }

    fn enter_fn_decl(&mut self, node: &FnDecl, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("FunctionDeclaration", node.span(), ctx)
    }

    fn leave_fn_decl(&mut self, node: &FnDecl, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("FunctionDeclaration", node.span(), ctx)
    }

    fn enter_arrow_expr(&mut self, node: &ArrowExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("ArrowFunctionExpression", node.span(), ctx)
    }

    fn leave_arrow_expr(&mut self, node: &ArrowExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("ArrowFunctionExpression", node.span(), ctx)
    }

    fn enter_block(
        &mut self,
        node: &BlockStmt,
        _context: &BlockContext<'_>,
        ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        self.enter("BlockStatement", node.span(), ctx)
    }

    fn leave_block(
        &mut self,
        node: &BlockStmt,
        _context: &BlockContext<'_>,
        ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        self.leave("BlockStatement", node.span(), ctx)
    }

    fn enter_if_stmt(&mut self, node: &IfStmt, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("IfStatement", node.span(), ctx)
    }

    fn leave_if_stmt(&mut self, node: &IfStmt, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("IfStatement", node.span(), ctx)
    }

    fn enter_var_decl(&mut self, node: &VarDecl, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("VariableDeclaration", node.span(), ctx)
    }

    fn leave_var_decl(&mut self, node: &VarDecl, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("VariableDeclaration", node.span(), ctx)
    }

    fn enter_var_declarator(
        &mut self,
        node: &VarDeclarator,
        ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        self.enter("VariableDeclarator", node.span(), ctx)
    }

    fn leave_var_declarator(
        &mut self,
        node: &VarDeclarator,
        ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        self.leave("VariableDeclarator", node.span(), ctx)
    }

    fn enter_call_expr(&mut self, node: &CallExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("CallExpression", node.span(), ctx)
    }

    fn leave_call_expr(&mut self, node: &CallExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("CallExpression", node.span(), ctx)
    }

    fn enter_new_expr(&mut self, node: &NewExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("NewExpression", node.span(), ctx)
    }

    fn leave_new_expr(&mut self, node: &NewExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("NewExpression", node.span(), ctx)
    }

    fn enter_member_expr(&mut self, node: &MemberExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("MemberExpression", node.span(), ctx)
    }

    fn leave_member_expr(&mut self, node: &MemberExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("MemberExpression", node.span(), ctx)
    }

    fn enter_bin_expr(&mut self, node: &BinExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("BinaryExpression", node.span(), ctx)
    }

    fn leave_bin_expr(&mut self, node: &BinExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("BinaryExpression", node.span(), ctx)
    }

    fn enter_assign_expr(&mut self, node: &AssignExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("AssignmentExpression", node.span(), ctx)
    }

    fn leave_assign_expr(&mut self, node: &AssignExpr, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("AssignmentExpression", node.span(), ctx)
    }

    fn enter_ident(&mut self, node: &Ident, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("Identifier", node.span(), ctx)
    }

    fn leave_ident(&mut self, node: &Ident, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("Identifier", node.span(), ctx)
    }

    fn enter_lit(&mut self, node: &Lit, ctx: &VisitorContext) -> ControlFlow<()> {
        self.enter("Literal", node.span(), ctx)
    }

    fn leave_lit(&mut self, node: &Lit, ctx: &VisitorContext) -> ControlFlow<()> {
        self.leave("Literal", node.span(), ctx)
    }
}
