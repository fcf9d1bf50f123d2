//! Run mode: newline-delimited JSON events on stdin

use anyhow::{Context, Result};
use kai_core::{Event, Session, SessionConfig};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::console::CliConsole;

/// One input line, classified
#[derive(Debug)]
pub(crate) enum InputLine {
    Blank,
    Event(Box<Event>),
    Invalid(String),
}

pub(crate) fn parse_line(line: &str) -> InputLine {
    let line = line.trim();
    if line.is_empty() {
        return InputLine::Blank;
    }
    match serde_json::from_str::<Event>(line) {
        Ok(event) => InputLine::Event(Box::new(event)),
        Err(e) => InputLine::Invalid(e.to_string()),
    }
}

/// Execute run mode until stdin closes or the session is interrupted
pub async fn execute(config: SessionConfig, console: &CliConsole) -> Result<()> {
    let session = Arc::new(
        Session::start(config)
            .await
            .context("Failed to load hook and skill declarations")?,
    );
    console.info(&format!(
        "Session {} ready: {} hook(s), {} skill(s)",
        session.session_id(),
        session.registry().hook_count(),
        session.registry().skill_count()
    ));

    // Ctrl+C cancels in-flight hooks and stops reading input
    let watcher = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight hooks");
                session.cancel();
            }
        })
    };

    let handled = process_lines(&session, stdin_lines(), &mut io::stdout()).await;
    watcher.abort();

    let handled = handled?;
    info!("Handled {} event(s) in session {}", handled, session.session_id());
    if session.is_cancelled() {
        console.warn("Interrupted");
    }
    Ok(())
}

/// Stdin lines read on a plain thread
///
/// A blocking read can't be abandoned; keeping it off the runtime lets the
/// process exit while the thread still waits for input.
fn stdin_lines() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Handle every input line in order, writing one JSON document per line
///
/// Returns the number of events handled. Stops at end of input or as soon as
/// the session is cancelled, even while waiting for the next line.
pub(crate) async fn process_lines(
    session: &Session,
    mut lines: mpsc::Receiver<io::Result<String>>,
    out: &mut impl Write,
) -> Result<usize> {
    let mut line_no = 0usize;
    let mut handled = 0usize;

    loop {
        let line = tokio::select! {
            biased;
            _ = session.cancelled() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else { break };
        let line = line.context("Failed to read stdin")?;
        line_no += 1;

        match parse_line(&line) {
            InputLine::Blank => continue,
            InputLine::Invalid(message) => {
                warn!("Ignoring invalid event on line {}: {}", line_no, message);
                writeln!(out, "{}", json!({ "error": message, "line": line_no }))?;
            }
            InputLine::Event(event) => {
                let outcome = session.handle_event(*event).await;
                writeln!(out, "{}", serde_json::to_string(&outcome)?)?;
                handled += 1;
            }
        }
        out.flush()?;
    }

    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kai_core::EventKind;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn session(dir: &TempDir) -> Session {
        Session::start(SessionConfig::new(dir.path()).with_session_id("run"))
            .await
            .unwrap()
    }

    #[test]
    fn test_parse_event_line() {
        match parse_line(r#"{"kind":"UserPromptSubmit","payload":{"prompt":"hi"}}"#) {
            InputLine::Event(event) => {
                assert_eq!(event.kind, EventKind::UserPromptSubmit);
                assert_eq!(event.utterance(), Some("hi"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_without_payload() {
        match parse_line(r#"  {"kind":"SessionStart"}  "#) {
            InputLine::Event(event) => assert_eq!(event.kind, EventKind::SessionStart),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_blank_and_invalid_lines() {
        assert!(matches!(parse_line("   "), InputLine::Blank));
        assert!(matches!(parse_line("not json"), InputLine::Invalid(_)));
        assert!(matches!(parse_line(r#"{"kind":"Stop"}"#), InputLine::Invalid(_)));
    }

    #[tokio::test]
    async fn test_process_lines_writes_one_document_per_line() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir).await;
        let (tx, rx) = mpsc::channel(8);
        for line in [r#"{"kind":"SessionStart"}"#, "", "oops", r#"{"kind":"SessionEnd"}"#] {
            tx.send(Ok(line.to_string())).await.unwrap();
        }
        drop(tx);

        let mut out = Vec::new();
        let handled = process_lines(&session, rx, &mut out).await.unwrap();
        assert_eq!(handled, 2);

        let docs: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["event_kind"], "SessionStart");
        assert_eq!(docs[1]["line"], 3);
        assert_eq!(docs[2]["event_kind"], "SessionEnd");
    }

    #[tokio::test]
    async fn test_cancel_stops_loop_while_waiting_for_input() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(session(&dir).await);
        // input stays open with nothing to read
        let (_tx, rx) = mpsc::channel(1);

        let canceller = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                session.cancel();
            })
        };

        let mut out = Vec::new();
        let handled = tokio::time::timeout(
            Duration::from_secs(2),
            process_lines(&session, rx, &mut out),
        )
        .await
        .expect("loop did not stop after cancel")
        .unwrap();
        assert_eq!(handled, 0);
        assert!(out.is_empty());
        canceller.await.unwrap();
    }
}
