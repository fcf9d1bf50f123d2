//! Command router - dispatches CLI commands to their handlers

use anyhow::Result;
use kai_core::SessionConfig;

use crate::args::{Cli, Commands};
use crate::commands;
use crate::console::CliConsole;

/// Route the CLI command to the appropriate handler
pub async fn route(cli: Cli) -> Result<()> {
    let config = session_config(&cli)?;
    let console = CliConsole::new(cli.verbose);

    match cli.command {
        None | Some(Commands::Run) => commands::run::execute(config, &console).await,
        Some(Commands::Dispatch { kind, payload }) => {
            commands::dispatch::execute(config, kind, payload.as_deref()).await
        }
        Some(Commands::Match { utterance }) => {
            commands::inspect::match_utterance(&config, &utterance.join(" ")).await
        }
        Some(Commands::Hooks) => commands::inspect::list_hooks(&config, &console).await,
        Some(Commands::Skills) => commands::inspect::list_skills(&config, &console).await,
    }
}

/// Environment configuration with command-line overrides applied
fn session_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = SessionConfig::from_env_at(cli.base_dir.as_deref())?;
    if let Some(log_dir) = &cli.log_dir {
        config = config.with_log_dir(log_dir);
    }
    if let Some(session_id) = &cli.session_id {
        config = config.with_session_id(session_id);
    }
    Ok(config)
}
