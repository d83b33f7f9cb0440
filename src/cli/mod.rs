//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod args;
pub mod context;
pub mod gitlab;
pub mod init;
pub mod operation;
pub mod project;
pub mod repo;
pub mod status;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

use crate::provision::ProcessTemplate;

/// adomigrate - Azure DevOps provisioning companion for GitLab migrations
#[derive(Parser, Debug)]
#[command(name = "adomigrate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "ADOMIGRATE_FORMAT",
        default_value = "table",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "ADOMIGRATE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Azure DevOps organization or collection URL
    #[arg(long, global = true, env = "ADO_URL", hide_env_values = true)]
    pub ado_url: Option<String>,

    /// Azure DevOps personal access token
    #[arg(long, global = true, env = "ADO_PAT", hide_env_values = true)]
    pub ado_pat: Option<String>,

    /// GitLab instance URL
    #[arg(long, global = true, env = "GITLAB_URL", hide_env_values = true)]
    pub gitlab_url: Option<String>,

    /// GitLab access token
    #[arg(long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub gitlab_token: Option<String>,

    /// Accept self-signed certificates (enables the fallback transport)
    #[arg(long, global = true, env = "ADOMIGRATE_INSECURE", hide_env = true)]
    pub insecure: bool,

    /// Log every REST call
    #[arg(long, global = true, env = "ADOMIGRATE_LOG_CALLS", hide_env = true)]
    pub log_calls: bool,

    /// Enable debug logging
    #[arg(long, global = true, env = "ADOMIGRATE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize adomigrate configuration
    Init,

    /// Show configuration status
    Status,

    /// Display version information
    Version,

    /// Azure DevOps projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Azure DevOps Git repositories
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Azure DevOps long-running operations
    #[command(subcommand)]
    Operation(OperationCommands),

    /// GitLab lookups
    #[command(subcommand)]
    Gitlab(GitLabCommands),
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List projects in the collection
    List {
        /// Bypass the 15 minute project cache
        #[arg(long)]
        refresh: bool,
    },

    /// Create a project unless it already exists
    Ensure {
        /// Project name
        name: String,

        /// Project description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Process template for a new project
        #[arg(long, value_enum, default_value = "agile")]
        process: ProcessTemplate,
    },
}

/// Repository subcommands
#[derive(Subcommand, Debug)]
pub enum RepoCommands {
    /// List repositories in a project
    List {
        /// Project name
        project: String,
    },

    /// Create a repository unless it already exists
    Ensure {
        /// Project name
        project: String,

        /// Repository name
        name: String,
    },
}

/// Operation subcommands
#[derive(Subcommand, Debug)]
pub enum OperationCommands {
    /// Poll an operation until it finishes
    Wait {
        /// Operation id
        id: String,

        /// Seconds between polls
        #[arg(long, default_value_t = 3)]
        interval: u64,

        /// Give up after this many polls
        #[arg(long, default_value_t = 60)]
        max_polls: u32,
    },
}

/// GitLab subcommands
#[derive(Subcommand, Debug)]
pub enum GitLabCommands {
    /// Show a GitLab project
    Project {
        /// Numeric id or namespace path (group/subgroup/project)
        id: String,
    },
}
