//! Explain command - provides detailed explanation of a rule

use std::env;

use clap::Args;
use colored::Colorize;

use civet_core::analysis::AnalysisEngine;
use civet_core::config::load_config_or_default;
use civet_core::rules::{RuleCategory, Severity};

#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[arg(
        value_name = "RULE_ID",
        help = "Rule ID to explain (e.g., \"S001\", \"no-injection\")"
    )]
    pub rule_id: String,
}

impl ExplainArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        let cwd = env::current_dir()?;
        let config = load_config_or_default(&cwd)?;
        let engine = AnalysisEngine::with_config(&config);

        let Some(rule) = engine.registry().get_rule(&self.rule_id) else {
            anyhow::bail!(
                "Unknown rule '{}'. Try an id like S001 or a name like no-injection.",
                self.rule_id
            );
        };

        let metadata = rule.metadata();

        println!();
        println!("{}", format!("Rule {}", metadata.id).bold());
        println!();
        println!("  {}: {}", "Name".cyan(), metadata.name);
        println!("  {}: {}", "Description".cyan(), metadata.description);
        println!("  {}: {}", "Category".cyan(), format_category(&metadata.category));
        println!("  {}: {}", "Severity".cyan(), format_severity(&metadata.severity));

        if let Some(url) = metadata.docs_url {
            println!("  {}: {}", "Documentation".cyan(), url);
        }

        if let Some(examples) = metadata.examples {
            println!();
            println!("  {}:", "Examples".cyan());
            for line in examples.lines() {
                println!("    {line}");
            }
        }

        println!();
        Ok(())
    }
}

fn format_category(category: &RuleCategory) -> &'static str {
    match category {
        RuleCategory::Quality => "quality",
        RuleCategory::Security => "security",
    }
}

fn format_severity(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
        Severity::Hint => "hint",
    }
}
