//! adomigrate - Azure DevOps provisioning companion for GitLab migrations

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod mask;
mod output;
mod provision;

use cli::{
    Cli, Commands, GitLabCommands, GlobalOptions, OperationCommands, ProjectCommands,
    RepoCommands,
};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `warn` by default, `info` for this crate with call logging, `debug` with
/// `--debug`. `RUST_LOG` wins when set.
fn init_logging(cli: &Cli) {
    // Logging starts before the config is merged, so peek at the file for `log_calls`
    let log_calls = cli.log_calls
        || config::Config::load_or_default_at(cli.config.as_deref())
            .map(|c| c.log_calls)
            .unwrap_or(false);

    let default_filter = if cli.debug {
        "debug"
    } else if log_calls {
        "warn,adomigrate=info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init => cli::init::run(&opts).await,
        Commands::Status => cli::status::run(&opts),
        Commands::Version => {
            println!("adomigrate version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Project(cmd) => match cmd {
            ProjectCommands::List { refresh } => cli::project::list(&opts, refresh).await,
            ProjectCommands::Ensure {
                name,
                description,
                process,
            } => cli::project::ensure(&opts, name, description, process).await,
        },
        Commands::Repo(cmd) => match cmd {
            RepoCommands::List { project } => cli::repo::list(&opts, &project).await,
            RepoCommands::Ensure { project, name } => {
                cli::repo::ensure(&opts, &project, &name).await
            }
        },
        Commands::Operation(cmd) => match cmd {
            OperationCommands::Wait {
                id,
                interval,
                max_polls,
            } => cli::operation::wait(&opts, &id, interval, max_polls).await,
        },
        Commands::Gitlab(cmd) => match cmd {
            GitLabCommands::Project { id } => cli::gitlab::project(&opts, &id).await,
        },
    }
}
