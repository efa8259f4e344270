//! JSON output formatter for diagnostic display
//!
//! Provides structured JSON output for programmatic integration.

use std::collections::HashSet;

use serde::Serialize;

use civet_core::diagnostic::Diagnostic;
use civet_core::rules::Severity;

#[derive(Serialize)]
pub struct JsonOutput<'a> {
    pub version: &'static str,
    pub analyzed_path: &'a str,
    pub summary: JsonSummary,
    pub diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
pub struct JsonSummary {
    pub total_files: usize,
    pub files_with_issues: usize,
    pub total_diagnostics: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(
        &self,
        diagnostics: &[Diagnostic],
        total_files: usize,
        analyzed_path: &str,
    ) -> String {
        let files_with_issues: HashSet<&str> =
            diagnostics.iter().map(|d| d.file.as_str()).collect();

        let output = JsonOutput {
            version: env!("CARGO_PKG_VERSION"),
            analyzed_path,
            summary: JsonSummary {
                total_files,
                files_with_issues: files_with_issues.len(),
                total_diagnostics: diagnostics.len(),
                errors: count(diagnostics, Severity::Error),
                warnings: count(diagnostics, Severity::Warning),
            },
            diagnostics,
        };

        serde_json::to_string_pretty(&output).expect("diagnostics serialize cleanly")
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}
