//! Parser module for JavaScript/TypeScript source code
//!
//! Integrates with SWC for parsing source files into AST.

use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap, Spanned};
use swc_ecma_parser::{EsSyntax, Syntax, TsSyntax, parse_file_as_module};

pub use swc_ecma_ast::{EsVersion, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
}

pub fn detect_language(filename: &str) -> Language {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "ts" | "mts" | "cts" => Language::TypeScript,
        "tsx" => Language::Tsx,
        "jsx" => Language::Jsx,
        _ => Language::JavaScript,
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug)]
pub struct ParseResult {
    pub module: Option<Module>,
    pub errors: Vec<ParseError>,
    span_base: u32,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.module.is_some()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub language: Language,
    pub line_count: usize,
    pub has_errors: bool,
}

/// A parsed source file: the text, its AST (when parsing succeeded at least
/// partially), recovered parse errors, and the span base needed to map swc
/// byte positions back onto the text.
pub struct ParsedFile {
    source: String,
    metadata: FileMetadata,
    ast_module: Option<Module>,
    errors: Vec<ParseError>,
    span_base: u32,
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("metadata", &self.metadata)
            .field("has_module", &self.ast_module.is_some())
            .field("error_count", &self.errors.len())
            .finish()
    }
}

impl ParsedFile {
    pub fn from_source(filename: &str, source: &str) -> Self {
        let parser = Parser::for_file(filename);
        let parse_result = parser.parse_module_recovering(source);

        let line_count = if source.is_empty() {
            0
        } else {
            source.lines().count()
        };

        let metadata = FileMetadata {
            filename: filename.to_string(),
            language: detect_language(filename),
            line_count,
            has_errors: parse_result.has_errors(),
        };

        Self {
            source: source.to_string(),
            metadata,
            span_base: parse_result.span_base,
            ast_module: parse_result.module,
            errors: parse_result.errors,
        }
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn module(&self) -> Option<&Module> {
        self.ast_module.as_ref()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte position of the start of this file within its source map. Spans
    /// reported by swc are offsets from here, not from the start of the text.
    pub fn span_base(&self) -> u32 {
        self.span_base
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParserBuilder {
    jsx: bool,
    typescript: bool,
    decorators: bool,
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jsx(mut self, enabled: bool) -> Self {
        self.jsx = enabled;
        self
    }

    pub fn typescript(mut self, enabled: bool) -> Self {
        self.typescript = enabled;
        self
    }

    pub fn decorators(mut self, enabled: bool) -> Self {
        self.decorators = enabled;
        self
    }

    pub fn build(self) -> Parser {
        let syntax = if self.typescript {
            Syntax::Typescript(TsSyntax {
                tsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        } else {
            Syntax::Es(EsSyntax {
                jsx: self.jsx,
                decorators: self.decorators,
                ..Default::default()
            })
        };

        Parser { syntax }
    }
}

#[derive(Debug, Clone)]
pub struct Parser {
    syntax: Syntax,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            syntax: Syntax::Es(Default::default()),
        }
    }

    pub fn for_file(filename: &str) -> Self {
        match detect_language(filename) {
            Language::JavaScript => Self::new(),
            Language::TypeScript => Self::builder().typescript(true).build(),
            Language::Jsx => Self::builder().jsx(true).build(),
            Language::Tsx => Self::builder().typescript(true).jsx(true).build(),
        }
    }

    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    /// Parse a module, recovering from errors where swc can. A fatal error
    /// leaves `module` empty; recoverable errors are collected alongside the
    /// partial AST.
    pub fn parse_module_recovering(&self, code: &str) -> ParseResult {
        let source_map: Lrc<SourceMap> = Default::default();
        let fm = source_map
            .new_source_file(FileName::Custom("input.js".into()).into(), code.to_string());
        let span_base = fm.start_pos.0;

        let mut recovered_errors = Vec::new();

        let result = parse_file_as_module(
            &fm,
            self.syntax,
            EsVersion::latest(),
            None,
            &mut recovered_errors,
        );

        let to_parse_error = |e: swc_ecma_parser::error::Error| {
            let loc = source_map.lookup_char_pos(e.span().lo);
            ParseError {
                line: loc.line,
                column: loc.col_display,
                message: e.kind().msg().to_string(),
            }
        };

        let mut errors: Vec<ParseError> =
            recovered_errors.into_iter().map(&to_parse_error).collect();

        match result {
            Ok(module) => ParseResult {
                module: Some(module),
                errors,
                span_base,
            },
            Err(e) => {
                errors.push(to_parse_error(e));
                ParseResult {
                    module: None,
                    errors,
                    span_base,
                }
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_module() {
        let result = Parser::new().parse_module_recovering("const x = 1;");

        assert!(result.is_ok());
        assert!(!result.has_errors());
        assert_eq!(result.module.unwrap().body.len(), 1);
    }

    #[test]
    fn parse_invalid_syntax_collects_errors() {
        let result = Parser::new().parse_module_recovering("const = ;");

        assert!(result.has_errors());
        let error = &result.errors[0];
        assert_eq!(error.line, 1);
        assert!(!error.message.is_empty());
    }

    #[test]
    fn parse_recovers_from_missing_semicolons() {
        let code = "const a = 1\nconst b = 2\nfunction foo() { return a + b }\n";

        let result = Parser::new().parse_module_recovering(code);

        assert!(result.is_ok());
        assert_eq!(result.module.unwrap().body.len(), 3);
    }

    #[test]
    fn builder_creates_typescript_parser() {
        let parser = Parser::builder().typescript(true).build();

        let result = parser.parse_module_recovering("const x: number = 1;");

        assert!(result.is_ok());
        assert!(!result.has_errors());
    }

    #[test]
    fn builder_creates_jsx_parser() {
        let parser = Parser::builder().jsx(true).build();

        let result = parser.parse_module_recovering("const el = <div>Hello</div>;");

        assert!(result.is_ok());
    }

    #[test]
    fn detect_language_from_extension() {
        assert_eq!(detect_language("file.js"), Language::JavaScript);
        assert_eq!(detect_language("file.mjs"), Language::JavaScript);
        assert_eq!(detect_language("file.jsx"), Language::Jsx);
        assert_eq!(detect_language("file.ts"), Language::TypeScript);
        assert_eq!(detect_language("file.cts"), Language::TypeScript);
        assert_eq!(detect_language("file.tsx"), Language::Tsx);
        assert_eq!(detect_language("unknown"), Language::JavaScript);
    }

    #[test]
    fn parsed_file_exposes_metadata() {
        let parsed = ParsedFile::from_source("test.ts", "const x: number = 1;\nconst y = 2;");

        assert_eq!(parsed.metadata().filename, "test.ts");
        assert_eq!(parsed.metadata().language, Language::TypeScript);
        assert_eq!(parsed.metadata().line_count, 2);
        assert!(!parsed.metadata().has_errors);
        assert!(parsed.module().is_some());
    }

    #[test]
    fn parsed_file_records_parse_failure() {
        let parsed = ParsedFile::from_source("test.js", "const = ;");

        assert!(parsed.metadata().has_errors);
        assert!(!parsed.errors().is_empty());
    }

    #[test]
    fn parsed_file_span_base_maps_first_item_to_text_start() {
        let code = "const x = 1;";
        let parsed = ParsedFile::from_source("test.js", code);

        let module = parsed.module().unwrap();
        let span = swc_common::Spanned::span(&module.body[0]);
        let lo = (span.lo.0 - parsed.span_base()) as usize;

        assert_eq!(lo, 0, "first statement should start at text offset zero");
    }

    #[test]
    fn parsed_file_empty_source() {
        let parsed = ParsedFile::from_source("test.js", "");

        assert_eq!(parsed.metadata().line_count, 0);
        assert!(parsed.module().is_some());
    }
}
