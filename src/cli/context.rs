//! Command execution context
//!
//! Loads the config file, layers the CLI/environment overrides on top,
//! checks that the upstream a command needs is configured and builds the
//! session client.

use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::{MigrationClient, Side};
use crate::config::Config;
use crate::error::Result;

/// Context for command execution containing the client and runtime options.
pub struct CommandContext {
    /// Session client, built once per process
    pub client: MigrationClient,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Context for an Azure DevOps command
    pub fn ado(opts: &GlobalOptions) -> Result<Self> {
        Self::new(opts, Side::AzureDevOps)
    }

    /// Context for a GitLab command
    pub fn gitlab(opts: &GlobalOptions) -> Result<Self> {
        Self::new(opts, Side::GitLab)
    }

    /// Create a new command context.
    ///
    /// # Errors
    /// Returns an error if the config cannot be parsed, fails validation, or
    /// lacks the section `side` needs.
    pub fn new(opts: &GlobalOptions, side: Side) -> Result<Self> {
        let config = Self::load_config(opts)?;
        match side {
            Side::AzureDevOps => {
                config.require_ado()?;
            }
            Side::GitLab => {
                config.require_gitlab()?;
            }
        }

        let client = MigrationClient::new(config.to_session())?;
        log::debug!(
            "Session ready (tls: {}, max attempts: {})",
            config.tls,
            client.config().retry.max_attempts
        );

        Ok(Self {
            client,
            format: opts.format,
        })
    }

    /// The config file with overrides applied, validated
    pub fn load_config(opts: &GlobalOptions) -> Result<Config> {
        let mut config = Config::load_or_default_at(opts.config_ref())?;
        config.apply_overrides(&opts.overrides());
        config.validate()?;
        Ok(config)
    }
}
