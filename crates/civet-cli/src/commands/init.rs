//! Init command - initializes Civet configuration in a project

use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use civet_core::config::CONFIG_FILENAME;

const DEFAULT_CONFIG: &str = r#"# Civet configuration file
# See https://github.com/kzn-tools/civet for documentation

# File patterns to include in analysis
# include = ["src/**/*.js", "src/**/*.ts"]

# File patterns to exclude from analysis
# exclude = ["**/*.test.js", "**/*.spec.ts"]

[rules]
# Disable specific rules
# disabled = ["no-dead-code"]

# Override rule severity
# [rules.severity]
# no-injection = "warning"

[injection]
# Additional payload markers checked at every dangerous call
# payloads = ["&& rm"]

# Solver timeout per query, in milliseconds
# solver_timeout_ms = 5000

# Additional dangerous calls: callee = "exec" | "spawn"
# [injection.sinks]
# execa = "exec"
"#;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(&self) -> Result<()> {
        self.run_in(Path::new("."))
    }

    fn run_in(&self, dir: &Path) -> Result<()> {
        let config_path = dir.join(CONFIG_FILENAME);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Config file '{}' already exists. Use --force to overwrite.",
                CONFIG_FILENAME
            );
        }

        fs::write(&config_path, DEFAULT_CONFIG)?;
        println!(
            "{} Created {} configuration file",
            "✓".green().bold(),
            CONFIG_FILENAME.cyan()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_toml() {
        let config: civet_core::config::Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, civet_core::config::Config::default());
    }

    #[test]
    fn creates_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs { force: false };

        args.run_in(dir.path()).unwrap();

        let written = fs::read_to_string(dir.path().join(CONFIG_FILENAME)).unwrap();
        assert!(written.contains("[injection]"));
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "include = []\n").unwrap();

        let args = InitArgs { force: false };
        assert!(args.run_in(dir.path()).is_err());

        let args = InitArgs { force: true };
        assert!(args.run_in(dir.path()).is_ok());
    }
}
