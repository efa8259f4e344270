//! Civet CLI - Command-line interface for the Civet injection analyzer
//!
//! Solver-backed JavaScript/TypeScript command-injection analyzer.

mod commands;
mod output;

use clap::Parser;
use commands::Commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "civet",
    author,
    version,
    about = "Solver-backed JavaScript/TypeScript command-injection analyzer",
    long_about = "Civet analyzes JavaScript and TypeScript sources for command-injection\n\
                  vulnerabilities. For every process-spawning call it builds a path-sensitive\n\
                  symbolic formula over the command line and asks a string-constraint solver\n\
                  for a concrete attacker input that reaches it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => args.run(),
        Commands::Init(args) => args.run(),
        Commands::Explain(args) => args.run(),
    }
}
