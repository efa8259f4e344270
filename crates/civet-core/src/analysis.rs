//! Analysis engine for code analysis and diagnostic generation
//!
//! Provides the core analysis functionality for CLI and other consumers.

use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::parser::ParsedFile;
use crate::rules::quality::NoDeadCode;
use crate::rules::security::NoInjection;
use crate::rules::{RuleRegistry, Severity};
use crate::taint::InjectionAnalyzer;

pub struct AnalysisEngine {
    registry: RuleRegistry,
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self {
            registry: create_registry(InjectionAnalyzer::new()),
        }
    }

    pub fn with_config(config: &Config) -> Self {
        let mut registry = create_registry(InjectionAnalyzer::from_config(&config.injection));
        registry.configure(&config.rules);
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn analyze(&self, file: &ParsedFile) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for error in file.errors() {
            diagnostics.push(Diagnostic::new(
                "PARSE",
                Severity::Error,
                error.message.clone(),
                &file.metadata().filename,
                error.line,
                error.column,
            ));
        }

        diagnostics.extend(self.registry.run_all(file));
        diagnostics
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn create_registry(analyzer: InjectionAnalyzer) -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.register(Box::new(NoInjection::with_analyzer(analyzer)));
    registry.register(Box::new(NoDeadCode::new()));
    registry
}
