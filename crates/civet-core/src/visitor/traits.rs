//! AstVisitor trait for uniform AST traversal.
//!
//! Every node kind the walker dispatches gets a paired `enter_*` (pre-order)
//! and `leave_*` (post-order) callback. Returning `ControlFlow::Break` from
//! any callback stops the whole traversal.

use std::ops::ControlFlow;

use swc_ecma_ast::{
    ArrowExpr, AssignExpr, BinExpr, BlockStmt, CallExpr, Expr, FnDecl, Function, Ident, IfStmt,
    Lit, MemberExpr, NewExpr, VarDecl, VarDeclarator,
};

use super::context::VisitorContext;

/// Why a block is being entered, derived from its parent construct.
///
/// The walker computes this while descending, so consumers can react to
/// function bodies and conditional branches without reconstructing parent
/// links. `Other` carries the parent's kind for anything outside the closed
/// set the engine models.
#[derive(Debug, Clone, Copy)]
pub enum BlockContext<'ast> {
    FunctionBody,
    IfBranch { test: &'ast Expr, alternate: bool },
    LoopBody,
    Other { parent: &'static str },
}

pub trait AstVisitor {
    fn enter_function(&mut self, _node: &Function, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_function(&mut self, _node: &Function, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_fn_decl(&mut self, _node: &FnDecl, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_fn_decl(&mut self, _node: &FnDecl, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_arrow_expr(&mut self, _node: &ArrowExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_arrow_expr(&mut self, _node: &ArrowExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_block(
        &mut self,
        _node: &BlockStmt,
        _context: &BlockContext<'_>,
        _ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_block(
        &mut self,
        _node: &BlockStmt,
        _context: &BlockContext<'_>,
        _ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_if_stmt(&mut self, _node: &IfStmt, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_if_stmt(&mut self, _node: &IfStmt, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_var_decl(&mut self, _node: &VarDecl, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_var_decl(&mut self, _node: &VarDecl, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_var_declarator(
        &mut self,
        _node: &VarDeclarator,
        _ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_var_declarator(
        &mut self,
        _node: &VarDeclarator,
        _ctx: &VisitorContext,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_call_expr(&mut self, _node: &CallExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_call_expr(&mut self, _node: &CallExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_new_expr(&mut self, _node: &NewExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_new_expr(&mut self, _node: &NewExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_member_expr(&mut self, _node: &MemberExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_member_expr(&mut self, _node: &MemberExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_bin_expr(&mut self, _node: &BinExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_bin_expr(&mut self, _node: &BinExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_assign_expr(&mut self, _node: &AssignExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_assign_expr(&mut self, _node: &AssignExpr, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_ident(&mut self, _node: &Ident, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_ident(&mut self, _node: &Ident, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn enter_lit(&mut self, _node: &Lit, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn leave_lit(&mut self, _node: &Lit, _ctx: &VisitorContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}
