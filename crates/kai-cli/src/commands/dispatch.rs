//! One-shot dispatch of a single event

use anyhow::{Context, Result, bail};
use kai_core::{Event, EventKind, Session, SessionConfig};

/// Handle one event and print its outcome as pretty JSON
pub async fn execute(config: SessionConfig, kind: EventKind, payload: Option<&str>) -> Result<()> {
    let payload = parse_payload(payload)?;
    let session = Session::start(config)
        .await
        .context("Failed to load hook and skill declarations")?;

    let outcome = session.handle_event(Event::new(kind, payload)).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn parse_payload(payload: Option<&str>) -> Result<serde_json::Value> {
    let Some(raw) = payload else {
        return Ok(serde_json::Value::Null);
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--payload is not valid JSON")?;
    if !value.is_object() {
        bail!("--payload must be a JSON object");
    }
    Ok(value)
}
