//! Hook input types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::{Event, EventKind};

/// JSON document written to a hook's stdin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookInput {
    #[serde(rename = "hook_event_name")]
    pub event: EventKind,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl HookInput {
    /// Build the input for an event within a session
    pub fn from_event(event: &Event, session_id: impl Into<String>) -> Self {
        Self {
            event: event.kind,
            session_id: session_id.into(),
            timestamp: event.timestamp,
            payload: event.payload.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for HookInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event: {}, Session: {}", self.event, self.session_id)
    }
}
