//! Repository command implementations

use colored::Colorize;
use tabled::Tabled;

use crate::cli::project::spinner;
use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::client::Repository;
use crate::error::Result;
use crate::output;
use crate::provision::{Ensured, ensure_repository};

/// Repository for table display
#[derive(Tabled)]
struct RepoDisplay {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DEFAULT BRANCH")]
    default_branch: String,
    #[tabled(rename = "REMOTE URL")]
    remote_url: String,
}

impl From<&Repository> for RepoDisplay {
    fn from(repo: &Repository) -> Self {
        Self {
            name: repo.name.clone(),
            default_branch: repo
                .default_branch
                .as_deref()
                .map(|b| b.trim_start_matches("refs/heads/").to_string())
                .unwrap_or_else(|| "-".to_string()),
            remote_url: repo.remote_url.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Run the repo list command
pub async fn list(opts: &GlobalOptions, project: &str) -> Result<()> {
    let ctx = CommandContext::ado(opts)?;
    let mut repos = ctx.client.list_repositories(project).await?;
    repos.sort_by_key(|r| r.name.to_lowercase());

    output::print_list(&repos, ctx.format, RepoDisplay::from)
}

/// Run the repo ensure command
pub async fn ensure(opts: &GlobalOptions, project: &str, name: &str) -> Result<()> {
    let ctx = CommandContext::ado(opts)?;

    let spinner = spinner(ctx.format, format!("Ensuring repository {}/{}...", project, name));
    let result = ensure_repository(&ctx.client, project, name).await;
    spinner.finish_and_clear();
    let ensured = result?;

    match ctx.format {
        OutputFormat::Json => println!("{}", output::json::format_json(&ensured)?),
        OutputFormat::Table => {
            let repo = ensured.get();
            match &ensured {
                Ensured::Created(_) => println!(
                    "{} Created repository {}/{}",
                    "✓".green(),
                    project,
                    repo.name.bold()
                ),
                Ensured::Existing(_) => println!(
                    "{} Repository {}/{} already exists",
                    "○".dimmed(),
                    project,
                    repo.name.bold()
                ),
            }
            if let Some(url) = &repo.remote_url {
                println!("  Remote: {}", url.cyan());
            }
        }
    }

    Ok(())
}
