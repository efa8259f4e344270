//! The path-scoped constraint formula.
//!
//! A [`Formula`] owns a stack of constraint scopes that grows and shrinks in
//! step with the lexical and branch structure of the analyzed program. Each
//! scope holds declarations, bindings and assertions; a child scope inherits
//! everything from its ancestors. Serialization renders exactly the clauses
//! from the root scope down to the current top — nothing from an exited
//! scope can leak into a query.
//!
//! Shadowing is handled with fresh solver symbols: redeclaring a name in a
//! nested scope allocates a new symbol that wins name resolution until the
//! scope is popped, and the formula keeps a symbol-to-source-name map so a
//! solver counter-example can always be reported against the variable the
//! developer wrote.
//!
//! The serialization target is SMT-LIB2 string theory: sort `String`,
//! `str.++` for concatenation, `str.contains` for the containment clauses
//! injection queries rely on.

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use super::symbol::{Constraint, SymbolicExpr};

#[derive(Debug, Clone)]
enum Clause {
    Declare(String),
    Bind(String, SymbolicExpr),
    Assert(Constraint),
}

/// Identifies one asserted clause instance, so retraction removes exactly
/// what was asserted rather than anything that happens to look like it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseId(u64);

#[derive(Debug, Default)]
struct ScopeFrame {
    clauses: Vec<(ClauseId, Clause)>,
    symbols: HashMap<String, String>,
}

#[derive(Debug)]
pub struct Formula {
    scopes: Vec<ScopeFrame>,
    /// Every solver symbol ever allocated, to keep shadowing symbols fresh.
    taken: HashSet<String>,
    /// Solver symbol back to the source-level name it stands for.
    origins: HashMap<String, String>,
    next_clause: u64,
    next_fresh: u32,
    solve_pending: bool,
}

impl Formula {
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeFrame::default()],
            taken: HashSet::new(),
            origins: HashMap::new(),
            next_clause: 0,
            next_fresh: 0,
            solve_pending: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(ScopeFrame::default());
    }

    pub fn exit_scope(&mut self) {
        assert!(
            self.scopes.len() > 1,
            "formula scope stack underflow: the root scope is never popped"
        );
        self.scopes.pop();
    }

    /// Enter a scope that pops itself when the guard is dropped, whatever the
    /// exit path. Queries use this so an error mid-query cannot leave its
    /// temporary declarations behind.
    pub fn scoped(&mut self) -> FormulaScope<'_> {
        self.enter_scope();
        FormulaScope { formula: self }
    }

    /// Introduce a fresh, unconstrained string variable for `name` in the
    /// current scope, shadowing any outer declaration of the same name.
    pub fn declare(&mut self, name: &str) {
        let symbol = self.fresh_symbol(name);
        self.origins.insert(symbol.clone(), name.to_string());
        self.current_scope()
            .symbols
            .insert(name.to_string(), symbol.clone());
        self.push_clause(Clause::Declare(symbol));
    }

    /// Constrain `name` to equal the given symbolic value.
    pub fn bind(&mut self, name: &str, value: &SymbolicExpr) {
        let symbol = self.resolve(name);
        let lowered = self.lower(value);
        self.push_clause(Clause::Bind(symbol, lowered));
    }

    /// Assert a boolean clause in the current scope. The returned id retracts
    /// exactly this instance.
    pub fn assert_constraint(&mut self, constraint: &Constraint) -> ClauseId {
        let lowered = self.lower_constraint(constraint);
        self.push_clause(Clause::Assert(lowered))
    }

    /// Remove a previously asserted clause. Retracting an id that is no
    /// longer active is a programming error.
    pub fn retract(&mut self, id: ClauseId) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(index) = scope.clauses.iter().position(|(cid, _)| *cid == id) {
                scope.clauses.remove(index);
                return;
            }
        }
        panic!("retract of a clause that is not active");
    }

    /// Append a satisfiability-check directive to the serialized formula.
    pub fn request_solve(&mut self) {
        self.solve_pending = true;
    }

    /// Remove the satisfiability-check directive again, so the same formula
    /// can serve further declarations and queries.
    pub fn cancel_solve(&mut self) {
        self.solve_pending = false;
    }

    /// The source-level name a solver symbol stands for. Symbols the formula
    /// never allocated (implicitly declared globals, member renderings) are
    /// their own source name.
    pub fn source_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.origins.get(symbol).map(String::as_str).unwrap_or(symbol)
    }

    /// Render the conjunction of all active clauses in SMT-LIB2 string
    /// theory. Symbols referenced but never declared are declared up front as
    /// unconstrained strings.
    pub fn serialize(&self) -> String {
        let mut declared: HashSet<&str> = HashSet::new();
        for scope in &self.scopes {
            for (_, clause) in &scope.clauses {
                if let Clause::Declare(symbol) = clause {
                    declared.insert(symbol);
                }
            }
        }

        let mut implicit: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for scope in &self.scopes {
            for (_, clause) in &scope.clauses {
                match clause {
                    Clause::Declare(_) => {}
                    Clause::Bind(symbol, value) => {
                        collect_free(symbol, &declared, &mut seen, &mut implicit);
                        value.for_each_var(&mut |name| {
                            collect_free(name, &declared, &mut seen, &mut implicit);
                        });
                    }
                    Clause::Assert(constraint) => {
                        constraint.for_each_var(&mut |name| {
                            collect_free(name, &declared, &mut seen, &mut implicit);
                        });
                    }
                }
            }
        }

        let mut out = String::new();
        for symbol in &implicit {
            out.push_str(&format!("(declare-const {} String)\n", quote_symbol(symbol)));
        }
        for scope in &self.scopes {
            for (_, clause) in &scope.clauses {
                out.push_str(&render_clause(clause));
                out.push('\n');
            }
        }
        if self.solve_pending {
            out.push_str("(check-sat)\n(get-model)\n");
        }
        out
    }

    fn current_scope(&mut self) -> &mut ScopeFrame {
        self.scopes.last_mut().expect("root scope always exists")
    }

    fn push_clause(&mut self, clause: Clause) -> ClauseId {
        let id = ClauseId(self.next_clause);
        self.next_clause += 1;
        self.current_scope().clauses.push((id, clause));
        id
    }

    fn fresh_symbol(&mut self, name: &str) -> String {
        let mut symbol = name.to_string();
        while !self.taken.insert(symbol.clone()) {
            self.next_fresh += 1;
            symbol = format!("{}!{}", name, self.next_fresh);
        }
        symbol
    }

    fn resolve(&self, name: &str) -> String {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.symbols.get(name) {
                return symbol.clone();
            }
        }
        name.to_string()
    }

    fn lower(&self, value: &SymbolicExpr) -> SymbolicExpr {
        match value {
            SymbolicExpr::Const(c) => SymbolicExpr::Const(c.clone()),
            SymbolicExpr::Var(name) => SymbolicExpr::Var(self.resolve(name)),
            SymbolicExpr::Concat(left, right) => {
                SymbolicExpr::concat(self.lower(left), self.lower(right))
            }
        }
    }

    fn lower_constraint(&self, constraint: &Constraint) -> Constraint {
        match constraint {
            Constraint::Eq(a, b) => Constraint::Eq(self.lower(a), self.lower(b)),
            Constraint::Contains(a, b) => Constraint::Contains(self.lower(a), self.lower(b)),
            Constraint::Not(inner) => self.lower_constraint(inner).negate(),
        }
    }
}

impl Default for Formula {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard returned by [`Formula::scoped`].
pub struct FormulaScope<'a> {
    formula: &'a mut Formula,
}

impl Deref for FormulaScope<'_> {
    type Target = Formula;

    fn deref(&self) -> &Formula {
        self.formula
    }
}

impl DerefMut for FormulaScope<'_> {
    fn deref_mut(&mut self) -> &mut Formula {
        self.formula
    }
}

impl Drop for FormulaScope<'_> {
    fn drop(&mut self) {
        self.formula.exit_scope();
    }
}

fn collect_free(
    name: &str,
    declared: &HashSet<&str>,
    seen: &mut HashSet<String>,
    implicit: &mut Vec<String>,
) {
    if !declared.contains(name) && seen.insert(name.to_string()) {
        implicit.push(name.to_string());
    }
}

fn render_clause(clause: &Clause) -> String {
    match clause {
        Clause::Declare(symbol) => format!("(declare-const {} String)", quote_symbol(symbol)),
        Clause::Bind(symbol, value) => {
            format!("(assert (= {} {}))", quote_symbol(symbol), render_expr(value))
        }
        Clause::Assert(constraint) => format!("(assert {})", render_constraint(constraint)),
    }
}

fn render_expr(value: &SymbolicExpr) -> String {
    match value {
        SymbolicExpr::Const(c) => render_string(c),
        SymbolicExpr::Var(name) => quote_symbol(name),
        SymbolicExpr::Concat(left, right) => {
            format!("(str.++ {} {})", render_expr(left), render_expr(right))
        }
    }
}

fn render_constraint(constraint: &Constraint) -> String {
    match constraint {
        Constraint::Eq(a, b) => format!("(= {} {})", render_expr(a), render_expr(b)),
        Constraint::Contains(a, b) => {
            format!("(str.contains {} {})", render_expr(a), render_expr(b))
        }
        Constraint::Not(inner) => format!("(not {})", render_constraint(inner)),
    }
}

/// SMT-LIB2 string literal: double quotes are escaped by doubling.
fn render_string(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Render a symbol, quoting it with `|...|` when it falls outside the
/// simple-symbol alphabet (member renderings with spaces, for example).
pub(crate) fn quote_symbol(symbol: &str) -> String {
    let simple = !symbol.is_empty()
        && !symbol.starts_with(|c: char| c.is_ascii_digit())
        && symbol.chars().all(|c| {
            c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c)
        });
    if simple {
        symbol.to_string()
    } else {
        let cleaned: String = symbol.chars().filter(|c| *c != '|' && *c != '\\').collect();
        format!("|{}|", cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_scope_always_exists() {
        let formula = Formula::new();
        assert_eq!(formula.depth(), 1);
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn exiting_root_scope_panics() {
        let mut formula = Formula::new();
        formula.exit_scope();
    }

    #[test]
    fn enter_exit_restores_depth() {
        let mut formula = Formula::new();
        formula.enter_scope();
        formula.enter_scope();
        formula.exit_scope();
        formula.exit_scope();
        assert_eq!(formula.depth(), 1);
    }

    #[test]
    fn scoped_guard_pops_on_drop() {
        let mut formula = Formula::new();
        {
            let mut scope = formula.scoped();
            scope.declare("tmp");
            assert_eq!(scope.depth(), 2);
        }
        assert_eq!(formula.depth(), 1);
        assert!(!formula.serialize().contains("tmp"));
    }

    #[test]
    fn declare_and_bind_serialize_as_declaration_and_equality() {
        let mut formula = Formula::new();
        formula.declare("x");
        formula.bind(
            "x",
            &SymbolicExpr::concat(SymbolicExpr::constant("echo "), SymbolicExpr::var("y")),
        );

        let text = formula.serialize();

        assert!(text.contains("(declare-const x String)"), "{text}");
        assert!(
            text.contains("(assert (= x (str.++ \"echo \" y)))"),
            "{text}"
        );
    }

    #[test]
    fn undeclared_symbols_are_declared_implicitly() {
        let mut formula = Formula::new();
        formula.declare("v");
        formula.bind("v", &SymbolicExpr::var("req.body.cmd"));

        let text = formula.serialize();

        assert!(text.contains("(declare-const req.body.cmd String)"), "{text}");
    }

    #[test]
    fn retraction_restores_serialization_byte_for_byte() {
        let mut formula = Formula::new();
        formula.declare("x");
        let before = formula.serialize();

        let id = formula.assert_constraint(&Constraint::contains(
            SymbolicExpr::var("x"),
            SymbolicExpr::constant(";a"),
        ));
        assert_ne!(formula.serialize(), before);

        formula.retract(id);
        assert_eq!(formula.serialize(), before);
    }

    #[test]
    fn retraction_removes_only_the_given_instance() {
        let mut formula = Formula::new();
        let clause = Constraint::contains(SymbolicExpr::var("x"), SymbolicExpr::constant(";a"));
        let first = formula.assert_constraint(&clause);
        let _second = formula.assert_constraint(&clause);

        formula.retract(first);

        let text = formula.serialize();
        assert_eq!(text.matches("str.contains").count(), 1);
    }

    #[test]
    fn exited_scope_clauses_do_not_leak() {
        let mut formula = Formula::new();
        formula.declare("x");
        formula.enter_scope();
        formula.assert_constraint(&Constraint::truthy(SymbolicExpr::var("x")));
        formula.exit_scope();

        assert!(!formula.serialize().contains("not"), "{}", formula.serialize());
    }

    #[test]
    fn shadowing_allocates_a_fresh_symbol_per_scope() {
        let mut formula = Formula::new();
        formula.declare("x");
        formula.bind("x", &SymbolicExpr::constant("outer"));
        formula.enter_scope();
        formula.declare("x");
        formula.bind("x", &SymbolicExpr::constant("inner"));

        let text = formula.serialize();
        assert!(text.contains("(assert (= x \"outer\"))"), "{text}");
        assert!(text.contains("(assert (= x!1 \"inner\"))"), "{text}");
        assert_eq!(formula.source_name("x!1"), "x");

        formula.exit_scope();
        assert!(!formula.serialize().contains("x!1"));
    }

    #[test]
    fn solve_request_brackets_the_check_sat_directive() {
        let mut formula = Formula::new();
        formula.declare("x");
        let plain = formula.serialize();

        formula.request_solve();
        let query = formula.serialize();
        assert!(query.ends_with("(check-sat)\n(get-model)\n"), "{query}");

        formula.cancel_solve();
        assert_eq!(formula.serialize(), plain);
    }

    #[test]
    fn string_constants_escape_embedded_quotes() {
        let mut formula = Formula::new();
        formula.declare("x");
        formula.bind("x", &SymbolicExpr::constant("say \"hi\""));

        assert!(formula.serialize().contains("\"say \"\"hi\"\"\""));
    }

    #[test]
    fn awkward_symbols_are_pipe_quoted() {
        assert_eq!(quote_symbol("req.body.cmd"), "req.body.cmd");
        assert_eq!(quote_symbol("a b"), "|a b|");
        assert_eq!(quote_symbol("2fast"), "|2fast|");
    }

    #[test]
    fn source_name_defaults_to_the_symbol_itself() {
        let formula = Formula::new();
        assert_eq!(formula.source_name("req.body.cmd"), "req.body.cmd");
    }
}
