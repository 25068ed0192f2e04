use crate::utils::error::{ImportError, Result};
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "repo-importer")]
#[command(about = "Validate and import a batch of repository source URLs")]
pub struct CliConfig {
    #[arg(long, help = "File with one URL per line (reads stdin when omitted or '-')")]
    pub input: Option<String>,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Registry file of already imported URLs (overrides config)")]
    pub registry: Option<String>,

    #[arg(
        long,
        conflicts_with = "input",
        help = "Retry the failures recorded in a previous JSON report"
    )]
    pub retry_from: Option<String>,

    #[arg(long, requires = "retry_from", help = "Also retry failures marked non-retryable")]
    pub include_non_retryable: bool,

    #[arg(long, help = "Print the final result as JSON")]
    pub json: bool,

    #[arg(long, help = "Write the final result as JSON to this file")]
    pub report: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory statistics")]
    pub monitor: bool,
}

impl CliConfig {
    pub fn reads_stdin(&self) -> bool {
        self.retry_from.is_none() && self.input.as_deref().map_or(true, |p| p == "-")
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let paths = [
            ("--input", &self.input),
            ("--config", &self.config),
            ("--registry", &self.registry),
            ("--retry-from", &self.retry_from),
            ("--report", &self.report),
        ];
        for (field, value) in paths {
            if let Some(path) = value {
                validate_path(field, path)?;
            }
        }

        if self.include_non_retryable && self.retry_from.is_none() {
            return Err(ImportError::ConfigValidationError {
                field: "--include-non-retryable".to_string(),
                message: "only valid together with --retry-from".to_string(),
            });
        }

        Ok(())
    }
}
