//! Lifecycle events
//!
//! Defines the fixed set of lifecycle stages emitted by the host runtime and
//! the immutable [`Event`] value that carries one of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KaiError;

/// Lifecycle event kinds a hook can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Session starts
    SessionStart,
    /// User submits a prompt
    UserPromptSubmit,
    /// Before tool execution
    PreToolUse,
    /// After tool execution
    PostToolUse,
    /// Session ends
    SessionEnd,
    /// Before context compaction
    PreCompact,
}

impl EventKind {
    /// Payload field that best summarizes an event of this kind
    pub fn payload_field(&self) -> &'static str {
        match self {
            EventKind::SessionStart => "source",
            EventKind::UserPromptSubmit => "prompt",
            EventKind::PreToolUse | EventKind::PostToolUse => "tool_name",
            EventKind::SessionEnd => "reason",
            EventKind::PreCompact => "trigger",
        }
    }

    /// Get a human-readable description of this event
    pub fn description(&self) -> &'static str {
        match self {
            EventKind::SessionStart => "Session starts",
            EventKind::UserPromptSubmit => "User submits a prompt",
            EventKind::PreToolUse => "Before tool execution",
            EventKind::PostToolUse => "After tool execution",
            EventKind::SessionEnd => "Session ends",
            EventKind::PreCompact => "Before context compaction",
        }
    }

    /// Returns all event kinds in lifecycle order
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::SessionStart,
            EventKind::UserPromptSubmit,
            EventKind::PreToolUse,
            EventKind::PostToolUse,
            EventKind::SessionEnd,
            EventKind::PreCompact,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionStart => "SessionStart",
            EventKind::UserPromptSubmit => "UserPromptSubmit",
            EventKind::PreToolUse => "PreToolUse",
            EventKind::PostToolUse => "PostToolUse",
            EventKind::SessionEnd => "SessionEnd",
            EventKind::PreCompact => "PreCompact",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = KaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| KaiError::invalid_declaration(format!("Unknown event kind '{}'", s)))
    }
}

/// A discrete occurrence emitted by the host runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Create an event with an empty payload
    pub fn bare(kind: EventKind) -> Self {
        Self::new(kind, serde_json::Value::Null)
    }

    /// Create a `UserPromptSubmit` event carrying an utterance
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(
            EventKind::UserPromptSubmit,
            serde_json::json!({ "prompt": text.into() }),
        )
    }

    /// The utterance carried by a `UserPromptSubmit` event
    pub fn utterance(&self) -> Option<&str> {
        if self.kind != EventKind::UserPromptSubmit {
            return None;
        }
        self.payload.get("prompt").and_then(|p| p.as_str())
    }

    /// Short summary of the payload, used in log lines
    pub fn summary(&self) -> Option<&str> {
        self.payload
            .get(self.kind.payload_field())
            .and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_payload_field() {
        assert_eq!(EventKind::PreToolUse.payload_field(), "tool_name");
        assert_eq!(EventKind::PostToolUse.payload_field(), "tool_name");
        assert_eq!(EventKind::UserPromptSubmit.payload_field(), "prompt");
        assert_eq!(EventKind::SessionStart.payload_field(), "source");
        assert_eq!(EventKind::SessionEnd.payload_field(), "reason");
        assert_eq!(EventKind::PreCompact.payload_field(), "trigger");
    }

    #[test]
    fn test_event_kind_all() {
        let all = EventKind::all();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], EventKind::SessionStart);
        assert!(all.contains(&EventKind::PreCompact));
    }

    #[test]
    fn test_event_kind_display_and_parse() {
        for kind in EventKind::all() {
            let parsed: EventKind = kind.to_string().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert_eq!(
            "sessionstart".parse::<EventKind>().unwrap(),
            EventKind::SessionStart
        );
        assert!("Stop".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_kind_serialization() {
        let json = serde_json::to_string(&EventKind::UserPromptSubmit).unwrap();
        assert_eq!(json, "\"UserPromptSubmit\"");
    }

    #[test]
    fn test_prompt_event_utterance() {
        let event = Event::prompt("Do some research");
        assert_eq!(event.kind, EventKind::UserPromptSubmit);
        assert_eq!(event.utterance(), Some("Do some research"));
        assert_eq!(event.summary(), Some("Do some research"));
    }

    #[test]
    fn test_utterance_only_for_prompt_events() {
        let event = Event::new(
            EventKind::PreToolUse,
            serde_json::json!({ "prompt": "ignored", "tool_name": "Bash" }),
        );
        assert_eq!(event.utterance(), None);
        assert_eq!(event.summary(), Some("Bash"));
    }

    #[test]
    fn test_event_deserialize_defaults() {
        let event: Event = serde_json::from_str(r#"{"kind":"SessionEnd"}"#).unwrap();
        assert_eq!(event.kind, EventKind::SessionEnd);
        assert!(event.payload.is_null());
    }
}
