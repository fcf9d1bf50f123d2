//! Kai CLI application
//!
//! The event-source adaptor between a host assistant runtime and the Kai
//! engine.
//!
//! # Modes
//!
//! ## Run (default)
//! Reads newline-delimited JSON events from stdin and handles them in order
//! within one session, writing one JSON outcome per line to stdout.
//!
//! - **Command:** `kai` or `kai run`
//! - **Example:** `echo '{"kind":"SessionStart"}' | kai run`
//!
//! ## Dispatch (one-shot)
//! Handles a single event and prints its outcome. This is the mode hook
//! scripts in the host runtime call into.
//!
//! - **Command:** `kai dispatch <KIND> [--payload <json>]`
//!
//! ## Inspection
//! `kai match`, `kai hooks` and `kai skills` show what the declarations under
//! the base directory would do without running anything.
//!
//! Logs go to stderr (`RUST_LOG` filters them); stdout carries results only.

mod args;
mod commands;
mod console;
mod router;

use args::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only raises the default
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    router::route(cli).await
}
