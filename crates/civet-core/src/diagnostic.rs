//! Diagnostic reporting for analysis results
//!
//! Provides structured diagnostic information for issues found during analysis.

use serde::Serialize;

use crate::rules::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(
        rule_id: &str,
        severity: Severity,
        message: impl Into<String>,
        file: &str,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.into(),
            file: file.to_string(),
            line,
            column,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_carries_location_and_message() {
        let diag = Diagnostic::new("S001", Severity::Error, "bad call", "app.js", 3, 7);

        assert_eq!(diag.rule_id, "S001");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "bad call");
        assert_eq!(diag.file, "app.js");
        assert_eq!(diag.line, 3);
        assert_eq!(diag.column, 7);
        assert!(diag.suggestion.is_none());
    }

    #[test]
    fn with_suggestion_attaches_suggestion() {
        let diag = Diagnostic::new("S001", Severity::Error, "bad call", "app.js", 1, 1)
            .with_suggestion("use execFile with an argument array");

        assert!(diag.suggestion.unwrap().contains("execFile"));
    }

    #[test]
    fn diagnostic_serializes_to_json() {
        let diag = Diagnostic::new("Q001", Severity::Info, "note", "a.js", 2, 4);

        let json = serde_json::to_value(&diag).unwrap();

        assert_eq!(json["rule_id"], "Q001");
        assert_eq!(json["line"], 2);
        assert!(json.get("suggestion").is_none());
    }
}
