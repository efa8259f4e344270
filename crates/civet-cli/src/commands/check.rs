//! Check command - analyzes JavaScript/TypeScript files for issues

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use rayon::prelude::*;
use walkdir::WalkDir;

use civet_core::analysis::AnalysisEngine;
use civet_core::config::load_config_or_default;
use civet_core::diagnostic::Diagnostic;
use civet_core::parser::ParsedFile;
use civet_core::rules::Severity;

use crate::output::json::JsonFormatter;

const SUPPORTED_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts"];

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to file or directory to analyze
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format for diagnostics (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Fail on warnings (exit code 1)
    #[arg(long)]
    pub fail_on_warnings: bool,

    /// Filter diagnostics by minimum severity level (error, warning, info, hint)
    #[arg(long, value_name = "LEVEL")]
    pub severity: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl CheckArgs {
    pub fn run(&self) -> Result<()> {
        self.configure_colors();

        let config = load_config_or_default(&self.path)?;
        let files = discover_files(&self.path)?;

        if files.is_empty() {
            println!("No JavaScript/TypeScript files found.");
            return Ok(());
        }

        let engine = AnalysisEngine::with_config(&config);
        let min_severity = self.parse_severity()?;

        tracing::debug!(files = files.len(), "starting analysis");

        let all_diagnostics: Vec<Diagnostic> = files
            .par_iter()
            .filter_map(|file| {
                let content = fs::read_to_string(file).ok()?;
                let parsed = ParsedFile::from_source(&file.to_string_lossy(), &content);
                Some(engine.analyze(&parsed))
            })
            .flatten()
            .filter(|d| severity_level(&d.severity) >= severity_level(&min_severity))
            .collect();

        let error_count = count_severity(&all_diagnostics, Severity::Error);
        let warning_count = count_severity(&all_diagnostics, Severity::Warning);

        match self.format.as_str() {
            "json" => self.output_json(&all_diagnostics, files.len()),
            _ => self.output_text(&all_diagnostics),
        }

        if error_count > 0 || (warning_count > 0 && self.fail_on_warnings) {
            process::exit(1);
        }

        Ok(())
    }

    fn parse_severity(&self) -> Result<Severity> {
        match self.severity.as_deref() {
            Some("error") => Ok(Severity::Error),
            Some("warning") => Ok(Severity::Warning),
            Some("info") => Ok(Severity::Info),
            Some("hint") => Ok(Severity::Hint),
            Some(other) => anyhow::bail!(
                "Invalid severity '{}'. Valid values: error, warning, info, hint",
                other
            ),
            None => Ok(Severity::Hint),
        }
    }

    fn configure_colors(&self) {
        let no_color_env = std::env::var("NO_COLOR").is_ok();
        if self.no_color || no_color_env {
            colored::control::set_override(false);
        }
    }

    fn output_text(&self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warning => "warning".yellow().bold(),
                Severity::Info => "info".blue().bold(),
                Severity::Hint => "hint".cyan().bold(),
            };

            println!(
                "{}:{}:{}: {} [{}]: {}",
                diag.file,
                diag.line,
                diag.column,
                severity_str,
                diag.rule_id.dimmed(),
                diag.message
            );

            if let Some(suggestion) = &diag.suggestion {
                println!("  {} {}", "suggestion:".green(), suggestion);
            }
        }

        if !diagnostics.is_empty() {
            let error_count = count_severity(diagnostics, Severity::Error);
            let warning_count = count_severity(diagnostics, Severity::Warning);
            println!();
            println!(
                "Found {} error(s) and {} warning(s)",
                error_count, warning_count
            );
        }
    }

    fn output_json(&self, diagnostics: &[Diagnostic], total_files: usize) {
        let formatter = JsonFormatter::new();
        println!(
            "{}",
            formatter.format(diagnostics, total_files, &self.path.to_string_lossy())
        );
    }
}

fn count_severity(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

fn severity_level(severity: &Severity) -> u8 {
    match severity {
        Severity::Error => 4,
        Severity::Warning => 3,
        Severity::Info => 2,
        Severity::Hint => 1,
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn discover_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(if is_supported(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let skipped: HashSet<&str> = ["node_modules", ".git", "dist", "build"].into();

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !skipped.contains(name))
                .unwrap_or(true)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_supported_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("a.js"), "var x = 1;").unwrap();
        fs::write(nested.join("b.ts"), "const y = 2;").unwrap();
        fs::write(nested.join("readme.md"), "# nope").unwrap();

        let files = discover_files(dir.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_supported(f)));
    }

    #[test]
    fn skips_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let deps = dir.path().join("node_modules/pkg");
        fs::create_dir_all(&deps).unwrap();
        fs::write(deps.join("index.js"), "var x = 1;").unwrap();
        fs::write(dir.path().join("app.js"), "var y = 2;").unwrap();

        let files = discover_files(dir.path()).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.js"));
    }

    #[test]
    fn single_file_path_is_returned_directly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.mjs");
        fs::write(&file, "var x = 1;").unwrap();

        let files = discover_files(&file).unwrap();

        assert_eq!(files, vec![file]);
    }

    #[test]
    fn unsupported_single_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "hello").unwrap();

        assert!(discover_files(&file).unwrap().is_empty());
    }

    #[test]
    fn severity_levels_are_ordered() {
        assert!(severity_level(&Severity::Error) > severity_level(&Severity::Warning));
        assert!(severity_level(&Severity::Warning) > severity_level(&Severity::Info));
        assert!(severity_level(&Severity::Info) > severity_level(&Severity::Hint));
    }
}
