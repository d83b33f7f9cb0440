//! Init command implementation

use colored::Colorize;
use dialoguer::{Confirm, Input, Password, Select, theme::ColorfulTheme};

use crate::cli::GlobalOptions;
use crate::client::session::DEFAULT_API_VERSION;
use crate::client::{MigrationClient, TlsPolicy};
use crate::config::{AdoConfig, Config, GitLabConfig};
use crate::error::Result;

/// Run the init command
///
/// Existing retry, masking and logging settings are kept; the endpoints,
/// credentials and certificate policy are asked for again.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let theme = ColorfulTheme::default();
    let mut config = Config::load_or_default_at(opts.config_ref())?;

    println!("{}", "Welcome to adomigrate!".bold().green());
    println!("Let's set up your Azure DevOps and GitLab connections.\n");

    let ado_url: String = Input::with_theme(&theme)
        .with_prompt("Azure DevOps organization or collection URL")
        .with_initial_text(config.ado.as_ref().map(|a| a.base_url.clone()).unwrap_or_default())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.starts_with("https://") || input.starts_with("http://") {
                Ok(())
            } else {
                Err("URL must start with https:// or http://")
            }
        })
        .interact_text()?;

    let pat = Password::with_theme(&theme)
        .with_prompt("Azure DevOps personal access token")
        .interact()?;

    let api_version = config
        .ado
        .as_ref()
        .map(|a| a.api_version.clone())
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
    config.ado = Some(AdoConfig {
        base_url: ado_url.trim_end_matches('/').to_string(),
        pat: Some(pat),
        api_version,
    });

    let policies = ["strict", "permissive (self-signed certificates)"];
    let selected = Select::with_theme(&theme)
        .with_prompt("Certificate validation")
        .items(&policies)
        .default(if config.tls == TlsPolicy::Permissive { 1 } else { 0 })
        .interact()?;
    config.tls = if selected == 1 {
        TlsPolicy::Permissive
    } else {
        TlsPolicy::Strict
    };

    let want_gitlab = Confirm::with_theme(&theme)
        .with_prompt("Configure a GitLab source?")
        .default(config.gitlab.is_some())
        .interact()?;
    if want_gitlab {
        let gitlab_url: String = Input::with_theme(&theme)
            .with_prompt("GitLab URL")
            .with_initial_text(
                config
                    .gitlab
                    .as_ref()
                    .map(|g| g.base_url.clone())
                    .unwrap_or_else(|| "https://gitlab.com".to_string()),
            )
            .interact_text()?;
        let token = Password::with_theme(&theme)
            .with_prompt("GitLab access token")
            .interact()?;
        config.gitlab = Some(GitLabConfig {
            base_url: gitlab_url.trim_end_matches('/').to_string(),
            token: Some(token),
        });
    } else {
        config.gitlab = None;
    }

    config.validate()?;

    println!("\n{}", "Checking Azure DevOps access...".cyan());
    let client = MigrationClient::new(config.to_session())?;
    match client.list_projects(true).await {
        Ok(projects) => println!("{} Connected ({} project(s) visible)", "✓".green(), projects.len()),
        Err(err) => {
            println!("{} Could not reach Azure DevOps: {}", "⚠".yellow(), err);
            println!("  The configuration will be saved anyway.");
        }
    }

    config.save_at(opts.config_ref())?;

    let config_path = Config::resolve_path(opts.config_ref())?;
    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        config_path.display()
    );

    println!("\n{}", "You're all set! Try running:".bold());
    println!("  {} - Show configuration status", "adomigrate status".cyan());
    println!("  {} - List projects", "adomigrate project list".cyan());

    Ok(())
}
