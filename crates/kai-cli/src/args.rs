//! CLI argument definitions using clap
//!
//! - kai                          # Run mode: NDJSON events on stdin (default)
//! - kai dispatch SessionStart    # Handle one event
//! - kai match "some prompt"      # Show which skills would activate
//! - kai hooks / kai skills       # List declarations

use clap::{Parser, Subcommand};
use kai_core::EventKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kai")]
#[command(about = "Kai - lifecycle hook dispatcher and skill activation engine")]
#[command(version)]
pub struct Cli {
    /// Base directory holding settings.json and skills/ (overrides PAI_DIR)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Directory for the JSONL execution log (overrides PAI_LOG_DIR)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Session identifier (overrides PAI_SESSION_ID)
    #[arg(long, global = true)]
    pub session_id: Option<String>,

    /// Enable verbose logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Handle newline-delimited JSON events from stdin
    Run,

    /// Handle a single event and print its outcome
    Dispatch {
        /// Event kind, e.g. SessionStart or UserPromptSubmit
        #[arg(value_parser = parse_event_kind)]
        kind: EventKind,

        /// Event payload as a JSON object
        #[arg(long)]
        payload: Option<String>,
    },

    /// Show the skills an utterance would activate
    Match {
        /// The utterance; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,
    },

    /// List registered hooks in dispatch order
    Hooks,

    /// List available skills
    Skills,
}

fn parse_event_kind(value: &str) -> Result<EventKind, String> {
    value.parse().map_err(|_| {
        let kinds: Vec<_> = EventKind::all().iter().map(EventKind::as_str).collect();
        format!("unknown event kind '{}' (expected one of: {})", value, kinds.join(", "))
    })
}
