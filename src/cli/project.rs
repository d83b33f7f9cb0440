//! Project command implementations

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::client::{PollOptions, Project};
use crate::error::Result;
use crate::output;
use crate::provision::{Ensured, ProcessTemplate, ProjectSpec, ensure_project};

/// Project for table display
#[derive(Tabled)]
struct ProjectDisplay {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "VISIBILITY")]
    visibility: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Project> for ProjectDisplay {
    fn from(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            state: project.state.clone().unwrap_or_else(|| "-".to_string()),
            visibility: project.visibility.clone().unwrap_or_else(|| "-".to_string()),
            id: project.id.clone(),
        }
    }
}

/// Run the project list command
pub async fn list(opts: &GlobalOptions, refresh: bool) -> Result<()> {
    let ctx = CommandContext::ado(opts)?;
    let mut projects = ctx.client.list_projects(refresh).await?;
    projects.sort_by_key(|p| p.name.to_lowercase());

    output::print_list(&projects, ctx.format, ProjectDisplay::from)
}

/// Run the project ensure command
pub async fn ensure(
    opts: &GlobalOptions,
    name: String,
    description: Option<String>,
    process: ProcessTemplate,
) -> Result<()> {
    let ctx = CommandContext::ado(opts)?;
    let spec = ProjectSpec {
        description,
        process,
        ..ProjectSpec::new(name)
    };

    let spinner = spinner(ctx.format, format!("Ensuring project {}...", spec.name));
    let result = ensure_project(&ctx.client, &spec, PollOptions::default()).await;
    spinner.finish_and_clear();
    let ensured = result?;

    match ctx.format {
        OutputFormat::Json => println!("{}", output::json::format_json(&ensured)?),
        OutputFormat::Table => {
            let project = ensured.get();
            match &ensured {
                Ensured::Created(_) => {
                    println!("{} Created project {}", "✓".green(), project.name.bold())
                }
                Ensured::Existing(_) => println!(
                    "{} Project {} already exists",
                    "○".dimmed(),
                    project.name.bold()
                ),
            }
            println!("  ID: {}", project.id);
        }
    }

    Ok(())
}

/// Steady-tick spinner on stderr; hidden for JSON output
pub(crate) fn spinner(format: OutputFormat, message: String) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message(message);
    bar
}
