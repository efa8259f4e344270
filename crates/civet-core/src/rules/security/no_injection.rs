//! no-injection rule (S001): solver-backed command-injection detection.
//!
//! Wraps the symbolic taint engine: every finding becomes an error
//! diagnostic at the dangerous call site, naming the tainted variable and a
//! concrete value the solver proved can reach the command line. A file the
//! engine cannot model (unsupported construct) gets a single warning and no
//! further analysis, never a silently clean report.

use crate::diagnostic::Diagnostic;
use crate::parser::ParsedFile;
use crate::rules::{Rule, RuleCategory, RuleMetadata, Severity};
use crate::taint::InjectionAnalyzer;
use crate::visitor::VisitorContext;

pub struct NoInjection {
    metadata: RuleMetadata,
    analyzer: InjectionAnalyzer,
}

impl NoInjection {
    pub fn new() -> Self {
        Self::with_analyzer(InjectionAnalyzer::new())
    }

    /// Build the rule around a specific engine, e.g. one extended from
    /// configuration or one with a scripted solver in tests.
    pub fn with_analyzer(analyzer: InjectionAnalyzer) -> Self {
        Self {
            metadata: RuleMetadata {
                id: "S001",
                name: "no-injection",
                description: "Disallow process-spawning calls whose command line can carry an injected shell sequence",
                category: RuleCategory::Security,
                severity: Severity::Error,
                docs_url: None,
                examples: Some(
                    "// Bad\nvar file = req.body.file;\nchild_process.execSync(\"cat \" + file);\n\n// Good\nchild_process.execFileSync(\"cat\", [file]);",
                ),
            },
            analyzer,
        }
    }
}

impl Default for NoInjection {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for NoInjection {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn check(&self, file: &ParsedFile) -> Vec<Diagnostic> {
        let filename = &file.metadata().filename;

        match self.analyzer.analyze(file) {
            Ok(findings) => {
                let ctx = VisitorContext::new(file);
                findings
                    .into_iter()
                    .map(|finding| {
                        let (line, column) = ctx.span_to_location(finding.span);
                        Diagnostic::new(
                            "S001",
                            Severity::Error,
                            finding.message(),
                            filename,
                            line,
                            column,
                        )
                        .with_suggestion(
                            "Use an execFile-style call with an argument array, or escape the interpolated value",
                        )
                    })
                    .collect()
            }
            Err(error) => {
                vec![Diagnostic::new(
                    "S001",
                    Severity::Warning,
                    format!("injection analysis skipped: {error}"),
                    filename,
                    1,
                    1,
                )]
            }
        }
    }
}
