//! Translation from AST expressions into symbolic string values.
//!
//! The engine models every tracked value as a string: a constant, a named
//! symbolic variable, or a concatenation. Concatenation is the only operator
//! the analysis needs, because injection detection reduces to substring
//! containment over the finally assembled command line. Member accesses are
//! treated as opaque atomic names keyed by their source rendering, and a call
//! contributes its callee name concatenated with its translated arguments.
//!
//! Any expression shape outside the supported set is a hard
//! [`EngineError::UnsupportedConstruct`] failure. Approximating silently
//! would turn a missed translation into a missed vulnerability.

use swc_common::Spanned;
use swc_ecma_ast::{BinaryOp, Callee, Expr, Lit, UnaryOp};

use super::EngineError;
use crate::visitor::VisitorContext;

/// A symbolic string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolicExpr {
    Const(String),
    Var(String),
    Concat(Box<SymbolicExpr>, Box<SymbolicExpr>),
}

impl SymbolicExpr {
    pub fn constant(value: impl Into<String>) -> Self {
        SymbolicExpr::Const(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        SymbolicExpr::Var(name.into())
    }

    pub fn concat(left: SymbolicExpr, right: SymbolicExpr) -> Self {
        SymbolicExpr::Concat(Box::new(left), Box::new(right))
    }

    /// Visit every variable name referenced by this expression.
    pub fn for_each_var(&self, f: &mut impl FnMut(&str)) {
        match self {
            SymbolicExpr::Const(_) => {}
            SymbolicExpr::Var(name) => f(name),
            SymbolicExpr::Concat(left, right) => {
                left.for_each_var(f);
                right.for_each_var(f);
            }
        }
    }
}

/// A boolean constraint over symbolic strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Eq(SymbolicExpr, SymbolicExpr),
    Contains(SymbolicExpr, SymbolicExpr),
    Not(Box<Constraint>),
}

impl Constraint {
    pub fn contains(haystack: SymbolicExpr, needle: SymbolicExpr) -> Self {
        Constraint::Contains(haystack, needle)
    }

    pub fn negate(self) -> Self {
        Constraint::Not(Box::new(self))
    }

    /// Truthiness of a string value: it is not the empty string.
    pub fn truthy(value: SymbolicExpr) -> Self {
        Constraint::Eq(value, SymbolicExpr::constant("")).negate()
    }

    pub fn for_each_var(&self, f: &mut impl FnMut(&str)) {
        match self {
            Constraint::Eq(a, b) | Constraint::Contains(a, b) => {
                a.for_each_var(f);
                b.for_each_var(f);
            }
            Constraint::Not(inner) => inner.for_each_var(f),
        }
    }
}

/// Translate a source expression into its symbolic string value.
pub fn translate(expr: &Expr, ctx: &VisitorContext) -> Result<SymbolicExpr, EngineError> {
    match expr {
        Expr::Lit(lit) => literal_text(lit).map(SymbolicExpr::Const),
        Expr::Ident(ident) => Ok(SymbolicExpr::var(ident.sym.as_str())),
        Expr::Member(_) => Ok(SymbolicExpr::Var(render(expr, ctx)?)),
        Expr::Bin(bin) if bin.op == BinaryOp::Add => Ok(SymbolicExpr::concat(
            translate(&bin.left, ctx)?,
            translate(&bin.right, ctx)?,
        )),
        Expr::Bin(bin) => Err(EngineError::unsupported(
            "translating binary operator",
            bin.op.as_str(),
        )),
        Expr::Call(call) => {
            let callee = match &call.callee {
                Callee::Expr(callee) => callee,
                other => {
                    return Err(EngineError::unsupported(
                        "translating callee",
                        callee_kind(other),
                    ));
                }
            };
            let mut value = SymbolicExpr::Var(render(callee, ctx)?);
            for arg in &call.args {
                if arg.spread.is_some() {
                    return Err(EngineError::unsupported(
                        "translating call argument",
                        "SpreadElement",
                    ));
                }
                value = SymbolicExpr::concat(value, translate(&arg.expr, ctx)?);
            }
            Ok(value)
        }
        Expr::Paren(paren) => translate(&paren.expr, ctx),
        other => Err(EngineError::unsupported(
            "translating expression",
            expr_kind(other),
        )),
    }
}

/// Translate a branch condition into a boolean constraint. Equality and
/// inequality comparisons map directly; a bare string-valued expression
/// asserts non-emptiness.
pub fn translate_condition(expr: &Expr, ctx: &VisitorContext) -> Result<Constraint, EngineError> {
    match expr {
        Expr::Paren(paren) => translate_condition(&paren.expr, ctx),
        Expr::Unary(unary) if unary.op == UnaryOp::Bang => {
            Ok(translate_condition(&unary.arg, ctx)?.negate())
        }
        Expr::Bin(bin) => match bin.op {
            BinaryOp::EqEq | BinaryOp::EqEqEq => Ok(Constraint::Eq(
                translate(&bin.left, ctx)?,
                translate(&bin.right, ctx)?,
            )),
            BinaryOp::NotEq | BinaryOp::NotEqEq => Ok(Constraint::Eq(
                translate(&bin.left, ctx)?,
                translate(&bin.right, ctx)?,
            )
            .negate()),
            BinaryOp::Add => Ok(Constraint::truthy(translate(expr, ctx)?)),
            other => Err(EngineError::unsupported(
                "translating condition operator",
                other.as_str(),
            )),
        },
        other => Ok(Constraint::truthy(translate(other, ctx)?)),
    }
}

/// Collect the source-level names referenced inside an expression: the
/// identifiers, member-access renderings, and (for calls) the callee plus
/// every argument. Literals contribute nothing.
pub fn used_names(expr: &Expr, ctx: &VisitorContext) -> Result<Vec<String>, EngineError> {
    match expr {
        Expr::Lit(_) => Ok(Vec::new()),
        Expr::Ident(ident) => Ok(vec![ident.sym.to_string()]),
        Expr::Member(_) => Ok(vec![render(expr, ctx)?]),
        Expr::Bin(bin) => {
            let mut names = used_names(&bin.left, ctx)?;
            names.extend(used_names(&bin.right, ctx)?);
            Ok(names)
        }
        Expr::Call(call) => {
            let callee = match &call.callee {
                Callee::Expr(callee) => callee,
                other => {
                    return Err(EngineError::unsupported(
                        "collecting names from callee",
                        callee_kind(other),
                    ));
                }
            };
            let mut names = used_names(callee, ctx)?;
            for arg in &call.args {
                names.extend(used_names(&arg.expr, ctx)?);
            }
            Ok(names)
        }
        Expr::Paren(paren) => used_names(&paren.expr, ctx),
        other => Err(EngineError::unsupported(
            "collecting names from expression",
            expr_kind(other),
        )),
    }
}

/// The source text of an expression, used as the opaque name of member
/// accesses and callees.
pub fn render(expr: &Expr, ctx: &VisitorContext) -> Result<String, EngineError> {
    ctx.get_source_text(expr.span())
        .map(|text| text.to_string())
        .ok_or_else(|| EngineError::unsupported("rendering expression", expr_kind(expr)))
}

fn literal_text(lit: &Lit) -> Result<String, EngineError> {
    match lit {
        Lit::Str(s) => Ok(s.value.to_string()),
        Lit::Num(n) => Ok(n
            .raw
            .as_ref()
            .map(|raw| raw.to_string())
            .unwrap_or_else(|| n.value.to_string())),
        Lit::Bool(b) => Ok(b.value.to_string()),
        Lit::Null(_) => Ok("null".to_string()),
        other => Err(EngineError::unsupported(
            "translating literal",
            lit_kind(other),
        )),
    }
}

fn callee_kind(callee: &Callee) -> &'static str {
    match callee {
        Callee::Super(_) => "Super",
        Callee::Import(_) => "Import",
        Callee::Expr(expr) => expr_kind(expr),
    }
}

fn lit_kind(lit: &Lit) -> &'static str {
    match lit {
        Lit::Str(_) => "StringLiteral",
        Lit::Bool(_) => "BooleanLiteral",
        Lit::Null(_) => "NullLiteral",
        Lit::Num(_) => "NumericLiteral",
        Lit::BigInt(_) => "BigIntLiteral",
        Lit::Regex(_) => "RegExpLiteral",
        Lit::JSXText(_) => "JSXText",
    }
}

pub(crate) fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::This(_) => "ThisExpression",
        Expr::Array(_) => "ArrayExpression",
        Expr::Object(_) => "ObjectExpression",
        Expr::Fn(_) => "FunctionExpression",
        Expr::Unary(_) => "UnaryExpression",
        Expr::Update(_) => "UpdateExpression",
        Expr::Bin(_) => "BinaryExpression",
        Expr::Assign(_) => "AssignmentExpression",
        Expr::Member(_) => "MemberExpression",
        Expr::Cond(_) => "ConditionalExpression",
        Expr::Call(_) => "CallExpression",
        Expr::New(_) => "NewExpression",
        Expr::Seq(_) => "SequenceExpression",
        Expr::Ident(_) => "Identifier",
        Expr::Lit(_) => "Literal",
        Expr::Tpl(_) => "TemplateLiteral",
        Expr::TaggedTpl(_) => "TaggedTemplateExpression",
        Expr::Arrow(_) => "ArrowFunctionExpression",
        Expr::Paren(_) => "ParenthesizedExpression",
        Expr::Await(_) => "AwaitExpression",
        Expr::Yield(_) => "YieldExpression",
        _ => "Expression",
    }
}

#[cfg(test)]
mod tests {
    use swc_ecma_ast::{ModuleItem, Stmt};

    use super::*;
    use crate::parser::ParsedFile;

    fn with_expr(code: &str, f: impl FnOnce(&Expr, &VisitorContext)) {
        let parsed = ParsedFile::from_source("test.js", code);
        let ctx = VisitorContext::new(&parsed);
        let module = parsed.module().expect("test code should parse");
        let expr = match &module.body[0] {
            ModuleItem::Stmt(Stmt::Expr(stmt)) => &stmt.expr,
            other => panic!("expected expression statement, got {other:?}"),
        };
        f(expr, &ctx);
    }

    #[test]
    fn string_literal_becomes_constant() {
        with_expr("\"echo\";", |expr, ctx| {
            assert_eq!(translate(expr, ctx).unwrap(), SymbolicExpr::constant("echo"));
        });
    }

    #[test]
    fn identifier_becomes_variable() {
        with_expr("tainted;", |expr, ctx| {
            assert_eq!(translate(expr, ctx).unwrap(), SymbolicExpr::var("tainted"));
        });
    }

    #[test]
    fn member_access_is_an_opaque_name() {
        with_expr("req.body.cmd;", |expr, ctx| {
            assert_eq!(
                translate(expr, ctx).unwrap(),
                SymbolicExpr::var("req.body.cmd")
            );
        });
    }

    #[test]
    fn plus_becomes_concatenation() {
        with_expr("\"echo \" + x;", |expr, ctx| {
            assert_eq!(
                translate(expr, ctx).unwrap(),
                SymbolicExpr::concat(SymbolicExpr::constant("echo "), SymbolicExpr::var("x"))
            );
        });
    }

    #[test]
    fn other_binary_operators_are_unsupported() {
        with_expr("a - b;", |expr, ctx| {
            let err = translate(expr, ctx).unwrap_err();
            assert!(matches!(err, EngineError::UnsupportedConstruct { .. }));
        });
    }

    #[test]
    fn call_concatenates_callee_and_arguments() {
        with_expr("wrap(x, \"lit\");", |expr, ctx| {
            assert_eq!(
                translate(expr, ctx).unwrap(),
                SymbolicExpr::concat(
                    SymbolicExpr::concat(SymbolicExpr::var("wrap"), SymbolicExpr::var("x")),
                    SymbolicExpr::constant("lit")
                )
            );
        });
    }

    #[test]
    fn template_literal_is_unsupported() {
        with_expr("`echo ${x}`;", |expr, ctx| {
            let err = translate(expr, ctx).unwrap_err();
            assert!(err.to_string().contains("TemplateLiteral"), "{err}");
        });
    }

    #[test]
    fn used_names_skips_literals_and_walks_calls() {
        with_expr("run(\"a\" + x, req.body.cmd);", |expr, ctx| {
            assert_eq!(
                used_names(expr, ctx).unwrap(),
                vec!["run", "x", "req.body.cmd"]
            );
        });
    }

    #[test]
    fn equality_condition_translates_to_eq() {
        with_expr("x === \"safe\";", |expr, ctx| {
            assert_eq!(
                translate_condition(expr, ctx).unwrap(),
                Constraint::Eq(SymbolicExpr::var("x"), SymbolicExpr::constant("safe"))
            );
        });
    }

    #[test]
    fn inequality_condition_translates_to_negated_eq() {
        with_expr("x != \"safe\";", |expr, ctx| {
            assert_eq!(
                translate_condition(expr, ctx).unwrap(),
                Constraint::Eq(SymbolicExpr::var("x"), SymbolicExpr::constant("safe")).negate()
            );
        });
    }

    #[test]
    fn bare_identifier_condition_is_truthiness() {
        with_expr("flag;", |expr, ctx| {
            assert_eq!(
                translate_condition(expr, ctx).unwrap(),
                Constraint::truthy(SymbolicExpr::var("flag"))
            );
        });
    }

    #[test]
    fn relational_condition_is_unsupported() {
        with_expr("x > 3;", |expr, ctx| {
            assert!(translate_condition(expr, ctx).is_err());
        });
    }

    #[test]
    fn negated_condition_wraps_in_not() {
        with_expr("!flag;", |expr, ctx| {
            assert_eq!(
                translate_condition(expr, ctx).unwrap(),
                Constraint::truthy(SymbolicExpr::var("flag")).negate()
            );
        });
    }
}
