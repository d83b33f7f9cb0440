//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};
use crate::config::ConfigOverrides;

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; the file is merged in `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.adomigrate/config.yaml)
    pub config: Option<String>,

    pub ado_url: Option<String>,
    pub ado_pat: Option<String>,
    pub gitlab_url: Option<String>,
    pub gitlab_token: Option<String>,

    /// Accept self-signed certificates
    pub insecure: bool,

    /// Log one line per REST call
    pub log_calls: bool,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            ado_url: cli.ado_url.clone(),
            ado_pat: cli.ado_pat.clone(),
            gitlab_url: cli.gitlab_url.clone(),
            gitlab_token: cli.gitlab_token.clone(),
            insecure: cli.insecure,
            log_calls: cli.log_calls,
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// The subset that overrides the config file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            ado_url: self.ado_url.clone(),
            ado_pat: self.ado_pat.clone(),
            gitlab_url: self.gitlab_url.clone(),
            gitlab_token: self.gitlab_token.clone(),
            insecure: self.insecure,
            log_calls: self.log_calls,
        }
    }
}
