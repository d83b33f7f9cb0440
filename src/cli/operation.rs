//! Operation command implementations

use std::time::Duration;

use colored::Colorize;

use crate::cli::project::spinner;
use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::client::{OperationStatus, PollOptions};
use crate::error::Result;
use crate::output;

/// Run the operation wait command.
///
/// A failed or cancelled operation is reported and turned into an error so
/// the exit status reflects it.
pub async fn wait(opts: &GlobalOptions, id: &str, interval: u64, max_polls: u32) -> Result<()> {
    let ctx = CommandContext::ado(opts)?;
    let options = PollOptions {
        interval: Duration::from_secs(interval),
        max_polls,
    };

    let spinner = spinner(ctx.format, format!("Waiting for operation {}...", id));
    let result = ctx.client.wait_for_operation(id, options).await;
    spinner.finish_and_clear();
    let state = result?;

    match ctx.format {
        OutputFormat::Json => println!("{}", output::json::format_json(&state)?),
        OutputFormat::Table => {
            let mark = match state.status {
                OperationStatus::Succeeded => "✓".green(),
                OperationStatus::Pending => "○".dimmed(),
                OperationStatus::Failed | OperationStatus::Cancelled => "✗".red(),
            };
            println!(
                "{} Operation {} {} after {} poll(s)",
                mark,
                state.id.bold(),
                state.status,
                state.polls
            );
            if state.synthesized {
                println!("  {}", "Operation no longer exists; assumed completed".dimmed());
            } else if let Some(message) = &state.message {
                println!("  {}", message);
            }
        }
    }

    state.into_result()?;
    Ok(())
}
