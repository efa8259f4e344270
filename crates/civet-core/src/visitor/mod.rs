//! Visitor pattern for AST traversal.
//!
//! Provides enter/leave traversal over swc ASTs. The walker computes a
//! [`BlockContext`] for every block statement while descending, so consumers
//! see each block together with the construct that owns it (function body,
//! if-branch with its test, loop body) instead of having to track parents
//! themselves.

mod context;
mod traits;

pub use context::VisitorContext;
pub use traits::{AstVisitor, BlockContext};

use std::ops::ControlFlow;

use swc_ecma_ast::{BlockStmt, BlockStmtOrExpr, Module, Stmt};
use swc_ecma_visit::{Visit, VisitWith};

struct Walker<'a, V: AstVisitor> {
    visitor: &'a mut V,
    ctx: &'a VisitorContext<'a>,
    ancestors: Vec<&'static str>,
    stopped: bool,
}

impl<V: AstVisitor> Walker<'_, V> {
    fn guard(&mut self, flow: ControlFlow<()>) -> bool {
        if flow.is_break() {
            self.stopped = true;
        }
        self.stopped
    }

    fn walk_block(&mut self, block: &BlockStmt, context: BlockContext<'_>) {
        if self.stopped {
            return;
        }
        let flow = self.visitor.enter_block(block, &context, self.ctx);
        if self.guard(flow) {
            return;
        }
        self.ancestors.push("BlockStatement");
        for stmt in &block.stmts {
            if self.stopped {
                break;
            }
            stmt.visit_with(self);
        }
        self.ancestors.pop();
        if self.stopped {
            return;
        }
        let flow = self.visitor.leave_block(block, &context, self.ctx);
        self.guard(flow);
    }

    fn walk_branch(&mut self, test: &swc_ecma_ast::Expr, branch: &Stmt, alternate: bool) {
        match branch {
            Stmt::Block(block) => {
                self.walk_block(block, BlockContext::IfBranch { test, alternate });
            }
            stmt => stmt.visit_with(self),
        }
    }

    fn walk_loop_body(&mut self, body: &Stmt) {
        match body {
            Stmt::Block(block) => self.walk_block(block, BlockContext::LoopBody),
            stmt => stmt.visit_with(self),
        }
    }
}

/// Expands to the standard shape for a simple enter/children/leave node:
/// guard, enter callback, push the ancestor kind, default child traversal,
/// pop, leave callback.
macro_rules! walk_node {
    ($self:ident, $node:ident, $kind:literal, $enter:ident, $leave:ident) => {{
        if $self.stopped {
            return;
        }
        let flow = $self.visitor.$enter($node, $self.ctx);
        if $self.guard(flow) {
            return;
        }
        $self.ancestors.push($kind);
        $node.visit_children_with($self);
        $self.ancestors.pop();
        if $self.stopped {
            return;
        }
        let flow = $self.visitor.$leave($node, $self.ctx);
        $self.guard(flow);
    }};
}

/// Expands to an override that only records the ancestor kind, for constructs
/// the engine has no callbacks for but whose blocks must name their parent.
macro_rules! track_ancestor {
    ($name:ident, $ty:ty, $kind:literal) => {
        fn $name(&mut self, node: &$ty) {
            if self.stopped {
                return;
            }
            self.ancestors.push($kind);
            node.visit_children_with(self);
            self.ancestors.pop();
        }
    };
}

impl<V: AstVisitor> Visit for Walker<'_, V> {
    fn visit_function(&mut self, node: &swc_ecma_ast::Function) {
        if self.stopped {
            return;
        }
        let flow = self.visitor.enter_function(node, self.ctx);
        if self.guard(flow) {
            return;
        }
        self.ancestors.push("Function");
        for param in &node.params {
            if self.stopped {
                break;
            }
            param.visit_with(self);
        }
        if !self.stopped {
            if let Some(body) = &node.body {
                self.walk_block(body, BlockContext::FunctionBody);
            }
        }
        self.ancestors.pop();
        if self.stopped {
            return;
        }
        let flow = self.visitor.leave_function(node, self.ctx);
        self.guard(flow);
    }

    fn visit_fn_decl(&mut self, node: &swc_ecma_ast::FnDecl) {
        if self.stopped {
            return;
        }
        let flow = self.visitor.enter_fn_decl(node, self.ctx);
        if self.guard(flow) {
            return;
        }
        self.ancestors.push("FunctionDeclaration");
        node.ident.visit_with(self);
        if !self.stopped {
            node.function.visit_with(self);
        }
        self.ancestors.pop();
        if self.stopped {
            return;
        }
        let flow = self.visitor.leave_fn_decl(node, self.ctx);
        self.guard(flow);
    }

    fn visit_arrow_expr(&mut self, node: &swc_ecma_ast::ArrowExpr) {
        if self.stopped {
            return;
        }
        let flow = self.visitor.enter_arrow_expr(node, self.ctx);
        if self.guard(flow) {
            return;
        }
        self.ancestors.push("ArrowFunctionExpression");
        for param in &node.params {
            if self.stopped {
                break;
            }
            param.visit_with(self);
        }
        if !self.stopped {
            match &*node.body {
                BlockStmtOrExpr::BlockStmt(block) => {
                    self.walk_block(block, BlockContext::FunctionBody);
                }
                BlockStmtOrExpr::Expr(expr) => expr.visit_with(self),
            }
        }
        self.ancestors.pop();
        if self.stopped {
            return;
        }
        let flow = self.visitor.leave_arrow_expr(node, self.ctx);
        self.guard(flow);
    }

    fn visit_if_stmt(&mut self, node: &swc_ecma_ast::IfStmt) {
        if self.stopped {
            return;
        }
        let flow = self.visitor.enter_if_stmt(node, self.ctx);
        if self.guard(flow) {
            return;
        }
        self.ancestors.push("IfStatement");
        node.test.visit_with(self);
        if !self.stopped {
            self.walk_branch(&node.test, &node.cons, false);
        }
        if !self.stopped {
            if let Some(alt) = &node.alt {
                self.walk_branch(&node.test, alt, true);
            }
        }
        self.ancestors.pop();
        if self.stopped {
            return;
        }
        let flow = self.visitor.leave_if_stmt(node, self.ctx);
        self.guard(flow);
    }

    fn visit_for_stmt(&mut self, node: &swc_ecma_ast::ForStmt) {
        if self.stopped {
            return;
        }
        self.ancestors.push("ForStatement");
        if let Some(init) = &node.init {
            init.visit_with(self);
        }
        if let Some(test) = &node.test {
            test.visit_with(self);
        }
        if let Some(update) = &node.update {
            update.visit_with(self);
        }
        if !self.stopped {
            self.walk_loop_body(&node.body);
        }
        self.ancestors.pop();
    }

    fn visit_while_stmt(&mut self, node: &swc_ecma_ast::WhileStmt) {
        if self.stopped {
            return;
        }
        self.ancestors.push("WhileStatement");
        node.test.visit_with(self);
        if !self.stopped {
            self.walk_loop_body(&node.body);
        }
        self.ancestors.pop();
    }

    fn visit_do_while_stmt(&mut self, node: &swc_ecma_ast::DoWhileStmt) {
        if self.stopped {
            return;
        }
        self.ancestors.push("DoWhileStatement");
        if !self.stopped {
            self.walk_loop_body(&node.body);
        }
        node.test.visit_with(self);
        self.ancestors.pop();
    }

    fn visit_for_in_stmt(&mut self, node: &swc_ecma_ast::ForInStmt) {
        if self.stopped {
            return;
        }
        self.ancestors.push("ForInStatement");
        node.left.visit_with(self);
        node.right.visit_with(self);
        if !self.stopped {
            self.walk_loop_body(&node.body);
        }
        self.ancestors.pop();
    }

    fn visit_for_of_stmt(&mut self, node: &swc_ecma_ast::ForOfStmt) {
        if self.stopped {
            return;
        }
        self.ancestors.push("ForOfStatement");
        node.left.visit_with(self);
        node.right.visit_with(self);
        if !self.stopped {
            self.walk_loop_body(&node.body);
        }
        self.ancestors.pop();
    }

    fn visit_block_stmt(&mut self, node: &BlockStmt) {
        // Reached only for blocks the structured overrides above did not
        // claim: standalone blocks, try/catch/finally bodies, and the like.
        let parent = self.ancestors.last().copied().unwrap_or("Program");
        self.walk_block(node, BlockContext::Other { parent });
    }

    fn visit_var_decl(&mut self, node: &swc_ecma_ast::VarDecl) {
        walk_node!(self, node, "VariableDeclaration", enter_var_decl, leave_var_decl)
    }

    fn visit_var_declarator(&mut self, node: &swc_ecma_ast::VarDeclarator) {
        walk_node!(
            self,
            node,
            "VariableDeclarator",
            enter_var_declarator,
            leave_var_declarator
        )
    }

    fn visit_call_expr(&mut self, node: &swc_ecma_ast::CallExpr) {
        walk_node!(self, node, "CallExpression", enter_call_expr, leave_call_expr)
    }

    fn visit_new_expr(&mut self, node: &swc_ecma_ast::NewExpr) {
        walk_node!(self, node, "NewExpression", enter_new_expr, leave_new_expr)
    }

    fn visit_member_expr(&mut self, node: &swc_ecma_ast::MemberExpr) {
        walk_node!(self, node, "MemberExpression", enter_member_expr, leave_member_expr)
    }

    fn visit_bin_expr(&mut self, node: &swc_ecma_ast::BinExpr) {
        walk_node!(self, node, "BinaryExpression", enter_bin_expr, leave_bin_expr)
    }

    fn visit_assign_expr(&mut self, node: &swc_ecma_ast::AssignExpr) {
        walk_node!(self, node, "AssignmentExpression", enter_assign_expr, leave_assign_expr)
    }

    fn visit_ident(&mut self, node: &swc_ecma_ast::Ident) {
        walk_node!(self, node, "Identifier", enter_ident, leave_ident)
    }

    fn visit_lit(&mut self, node: &swc_ecma_ast::Lit) {
        walk_node!(self, node, "Literal", enter_lit, leave_lit)
    }

    track_ancestor!(visit_try_stmt, swc_ecma_ast::TryStmt, "TryStatement");
    track_ancestor!(visit_catch_clause, swc_ecma_ast::CatchClause, "CatchClause");
    track_ancestor!(visit_switch_stmt, swc_ecma_ast::SwitchStmt, "SwitchStatement");
    track_ancestor!(visit_labeled_stmt, swc_ecma_ast::LabeledStmt, "LabeledStatement");
    track_ancestor!(visit_with_stmt, swc_ecma_ast::WithStmt, "WithStatement");
    track_ancestor!(visit_constructor, swc_ecma_ast::Constructor, "Constructor");
    track_ancestor!(visit_getter_prop, swc_ecma_ast::GetterProp, "Property");
    track_ancestor!(visit_setter_prop, swc_ecma_ast::SetterProp, "Property");
    track_ancestor!(visit_static_block, swc_ecma_ast::StaticBlock, "StaticBlock");
}

pub fn walk_ast<V: AstVisitor>(module: &Module, visitor: &mut V, ctx: &VisitorContext) {
    let mut walker = Walker {
        visitor,
        ctx,
        ancestors: Vec::new(),
        stopped: false,
    };
    module.visit_with(&mut walker);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedFile;

    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
    }

    impl AstVisitor for EventLog {
        fn enter_function(
            &mut self,
            _node: &swc_ecma_ast::Function,
            _ctx: &VisitorContext,
        ) -> ControlFlow<()> {
            self.events.push("enter function".into());
            ControlFlow::Continue(())
        }

        fn leave_function(
            &mut self,
            _node: &swc_ecma_ast::Function,
            _ctx: &VisitorContext,
        ) -> ControlFlow<()> {
            self.events.push("leave function".into());
            ControlFlow::Continue(())
        }

        fn enter_block(
            &mut self,
            _node: &BlockStmt,
            context: &BlockContext<'_>,
            _ctx: &VisitorContext,
        ) -> ControlFlow<()> {
            self.events.push(format!("enter block {context:?}"));
            ControlFlow::Continue(())
        }

        fn leave_block(
            &mut self,
            _node: &BlockStmt,
            context: &BlockContext<'_>,
            _ctx: &VisitorContext,
        ) -> ControlFlow<()> {
            self.events.push(format!("leave block {context:?}"));
            ControlFlow::Continue(())
        }

        fn leave_call_expr(
            &mut self,
            _node: &swc_ecma_ast::CallExpr,
            _ctx: &VisitorContext,
        ) -> ControlFlow<()> {
            self.events.push("leave call".into());
            ControlFlow::Continue(())
        }
    }

    fn walk(code: &str) -> Vec<String> {
        let parsed = ParsedFile::from_source("test.js", code);
        let ctx = VisitorContext::new(&parsed);
        let mut log = EventLog::default();
        walk_ast(parsed.module().unwrap(), &mut log, &ctx);
        log.events
    }

    #[test]
    fn function_bodies_are_function_body_blocks() {
        let events = walk("function f(a) { g(a); }");

        assert_eq!(
            events,
            vec![
                "enter function",
                "enter block FunctionBody",
                "leave call",
                "leave block FunctionBody",
                "leave function",
            ]
        );
    }

    #[test]
    fn if_branches_carry_polarity() {
        let events = walk("if (x) { f(); } else { g(); }");

        let branches: Vec<_> = events
            .iter()
            .filter(|e| e.starts_with("enter block IfBranch"))
            .collect();
        assert_eq!(branches.len(), 2);
        assert!(branches[0].contains("alternate: false"));
        assert!(branches[1].contains("alternate: true"));
    }

    #[test]
    fn loop_bodies_are_loop_blocks() {
        let events = walk("for (;;) { f(); } while (x) { g(); }");

        let loops = events
            .iter()
            .filter(|e| e.starts_with("enter block LoopBody"))
            .count();
        assert_eq!(loops, 2);
    }

    #[test]
    fn standalone_block_names_its_parent() {
        let events = walk("try { f(); } finally { g(); }");

        assert!(
            events
                .iter()
                .any(|e| e.contains("Other") && e.contains("TryStatement")),
            "try blocks should be reported under TryStatement: {events:?}"
        );
    }

    #[test]
    fn arrow_block_body_is_function_body() {
        let events = walk("const f = (a) => { g(a); };");

        assert!(events.iter().any(|e| e == "enter block FunctionBody"));
    }

    #[test]
    fn break_stops_traversal() {
        struct StopAtCall {
            calls: usize,
        }

        impl AstVisitor for StopAtCall {
            fn enter_call_expr(
                &mut self,
                _node: &swc_ecma_ast::CallExpr,
                _ctx: &VisitorContext,
            ) -> ControlFlow<()> {
                self.calls += 1;
                ControlFlow::Break(())
            }
        }

        let parsed = ParsedFile::from_source("test.js", "f(); g(); h();");
        let ctx = VisitorContext::new(&parsed);
        let mut visitor = StopAtCall { calls: 0 };
        walk_ast(parsed.module().unwrap(), &mut visitor, &ctx);

        assert_eq!(visitor.calls, 1);
    }
}
