//! Visitor context providing file information during AST traversal.

use swc_common::Span;

use crate::parser::ParsedFile;

pub struct VisitorContext<'a> {
    file: &'a ParsedFile,
}

impl<'a> VisitorContext<'a> {
    pub fn new(file: &'a ParsedFile) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &ParsedFile {
        self.file
    }

    /// Map a span to a 1-based (line, column) pair.
    pub fn span_to_location(&self, span: Span) -> (usize, usize) {
        let source = self.file.source();
        let lo = self.relative(span.lo.0);

        if source.is_empty() {
            return (1, 1);
        }

        let prefix = &source[..lo.min(source.len())];
        let line = prefix.matches('\n').count() + 1;
        let last_newline = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = lo.min(source.len()) - last_newline + 1;

        (line, column)
    }

    /// The exact source text a span covers, or `None` for spans that do not
    /// lie within this file (e.g. dummy spans).
    pub fn get_source_text(&self, span: Span) -> Option<&str> {
        let source = self.file.source();
        let lo = self.relative(span.lo.0);
        let hi = self.relative(span.hi.0);

        if span.lo.0 == 0 || lo > hi || hi > source.len() {
            return None;
        }

        Some(&source[lo..hi])
    }

    fn relative(&self, pos: u32) -> usize {
        pos.saturating_sub(self.file.span_base()) as usize
    }
}

#[cfg(test)]
mod tests {
    use swc_common::Spanned;
    use swc_ecma_ast::{Decl, ModuleItem, Stmt};

    use super::*;

    fn first_decl_span(parsed: &ParsedFile) -> Span {
        match &parsed.module().unwrap().body[0] {
            ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => var.decls[0].name.span(),
            other => panic!("unexpected first item: {other:?}"),
        }
    }

    #[test]
    fn context_provides_file_reference() {
        let parsed = ParsedFile::from_source("test.js", "const x = 1;");
        let ctx = VisitorContext::new(&parsed);

        assert_eq!(ctx.file().metadata().filename, "test.js");
    }

    #[test]
    fn get_source_text_returns_exact_node_text() {
        let parsed = ParsedFile::from_source("test.js", "const total = 1;");
        let ctx = VisitorContext::new(&parsed);

        let span = first_decl_span(&parsed);

        assert_eq!(ctx.get_source_text(span), Some("total"));
    }

    #[test]
    fn span_to_location_accounts_for_lines() {
        let parsed = ParsedFile::from_source("test.js", "const a = 1;\nconst b = 2;");
        let ctx = VisitorContext::new(&parsed);

        let module = parsed.module().unwrap();
        let second = Spanned::span(&module.body[1]);
        let (line, column) = ctx.span_to_location(second);

        assert_eq!(line, 2);
        assert_eq!(column, 1);
    }

    #[test]
    fn get_source_text_rejects_dummy_span() {
        let parsed = ParsedFile::from_source("test.js", "const x = 1;");
        let ctx = VisitorContext::new(&parsed);

        assert_eq!(ctx.get_source_text(swc_common::DUMMY_SP), None);
    }
}
