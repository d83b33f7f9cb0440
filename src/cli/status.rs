//! Status command implementation

use colored::Colorize;

use crate::cli::{CommandContext, GlobalOptions};
use crate::client::TlsPolicy;
use crate::config::Config;
use crate::error::Result;
use crate::mask::{SecretMasker, mask_credential};

/// Run the status command to display configuration status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "adomigrate Configuration Status".bold());

    let config_path = Config::resolve_path(opts.config_ref())?;
    if config_path.exists() {
        println!("Config file: {}", config_path.display().to_string().cyan());
    } else {
        println!(
            "Config file: {} {}",
            config_path.display().to_string().cyan(),
            "(not found)".dimmed()
        );
    }
    println!();

    let config = CommandContext::load_config(opts)?;
    let masker = SecretMasker::new(config.mask_secrets);

    match &config.ado {
        Some(ado) => {
            println!("{} Azure DevOps: {}", "✓".green(), masker.mask(&ado.base_url));
            match ado.pat.as_deref().filter(|p| !p.is_empty()) {
                Some(pat) => println!("  PAT: {}", mask_credential(pat)),
                None => println!("  {} PAT not configured (set ado.pat or ADO_PAT)", "✗".red()),
            }
            println!("  API version: {}", ado.api_version);
        }
        None => {
            println!("{} Azure DevOps not configured", "✗".red());
            println!("  → Run 'adomigrate init' or set ADO_URL and ADO_PAT");
        }
    }

    match &config.gitlab {
        Some(gitlab) => {
            println!("{} GitLab: {}", "✓".green(), masker.mask(&gitlab.base_url));
            match gitlab.token.as_deref().filter(|t| !t.is_empty()) {
                Some(token) => println!("  Token: {}", mask_credential(token)),
                None => println!("  {} Token not configured (set gitlab.token or GITLAB_TOKEN)", "✗".red()),
            }
        }
        None => println!("{} GitLab not configured", "○".dimmed()),
    }

    println!();
    match config.tls {
        TlsPolicy::Strict => println!("TLS: {}", config.tls),
        TlsPolicy::Permissive => println!(
            "TLS: {} {}",
            config.tls.to_string().yellow(),
            "(certificates not verified; fallback transport enabled)".dimmed()
        ),
    }
    println!(
        "Retry: {} attempt(s), initial delay {}s",
        config.retry.max_attempts, config.retry.initial_delay_secs
    );
    println!("Secret masking: {}", on_off(config.mask_secrets));
    println!("Call logging: {}", on_off(config.log_calls));
    println!();

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
