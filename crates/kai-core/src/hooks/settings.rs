//! Hook declarations
//!
//! Hooks are declared in `settings.json` using the Claude settings shape:
//!
//! ```json
//! {
//!   "hooks": {
//!     "SessionStart": [
//!       { "hooks": [ { "type": "command", "command": "${PAI_DIR}/hooks/load-context" } ] }
//!     ]
//!   }
//! }
//! ```
//!
//! Declarations are parsed into typed [`HookRegistration`]s at startup.
//! Anything unrecognized is rejected rather than skipped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::registration::{HookRegistration, Invocation, default_enabled};
use crate::config::SessionConfig;
use crate::error::{KaiError, KaiResult};
use crate::event::EventKind;

/// Top-level settings document; unrelated keys are ignored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksSettings {
    /// Event name to matcher groups, in file order per event
    #[serde(default)]
    pub hooks: BTreeMap<String, Vec<HookMatcherGroup>>,
}

/// One entry in an event's list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookMatcherGroup {
    /// Tool-name filter from the Claude format; accepted but not applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    #[serde(default)]
    pub hooks: Vec<HookDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookDefinitionType {
    Command,
}

/// A single declared hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookDefinition {
    #[serde(rename = "type")]
    pub hook_type: HookDefinitionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, rename = "statusMessage", skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl HooksSettings {
    /// Parse a settings document
    pub fn parse(content: &str) -> KaiResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| KaiError::invalid_declaration(format!("Malformed hook settings: {}", e)))
    }

    /// Load settings from a file; a missing file declares no hooks
    pub async fn load(path: &Path) -> KaiResult<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No hook settings at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(KaiError::io_with_path(
                    format!("Failed to read hook settings: {}", e),
                    path.display().to_string(),
                ));
            }
        };

        Self::parse(&content).map_err(|e| match e {
            KaiError::InvalidDeclaration { message, .. } => {
                KaiError::invalid_declaration_at(message, path.display().to_string())
            }
            other => other,
        })
    }

    /// Convert declarations into registrations, in declaration order per event
    pub fn into_registrations(self, config: &SessionConfig) -> KaiResult<Vec<HookRegistration>> {
        let mut registrations = Vec::new();

        for (event_name, groups) in self.hooks {
            let event_kind: EventKind = event_name.parse()?;
            for group in groups {
                if let Some(matcher) = group.matcher.as_deref().filter(|m| *m != "*" && !m.is_empty()) {
                    debug!(
                        "Matcher '{}' on {} hooks is not applied; hooks run for every {} event",
                        matcher, event_kind, event_kind
                    );
                }
                for definition in group.hooks {
                    registrations.push(definition.into_registration(event_kind, config)?);
                }
            }
        }

        Ok(registrations)
    }
}

impl HookDefinition {
    fn into_registration(
        self,
        event_kind: EventKind,
        config: &SessionConfig,
    ) -> KaiResult<HookRegistration> {
        let (program, mut args) = if self.args.is_empty() {
            // No shell: whitespace separates tokens, nothing else is interpreted
            let mut tokens = self.command.split_whitespace();
            let program = tokens.next().map(str::to_string);
            (program, tokens.map(str::to_string).collect::<Vec<_>>())
        } else {
            let program = Some(self.command.trim().to_string()).filter(|p| !p.is_empty());
            (program, self.args)
        };

        let program = program.ok_or_else(|| {
            KaiError::invalid_declaration(format!("Empty command for {} hook", event_kind))
        })?;
        let program = config.expand(&program).into_owned();
        for arg in args.iter_mut() {
            *arg = config.expand(arg).into_owned();
        }

        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => Path::new(&program)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    KaiError::invalid_declaration(format!(
                        "Cannot derive an id for {} hook '{}'",
                        event_kind, program
                    ))
                })?,
        };

        let mut invocation = Invocation::new(program).with_args(args);
        for (key, value) in self.env {
            let value = config.expand(&value).into_owned();
            invocation = invocation.with_env(key, value);
        }

        let mut registration = HookRegistration::new(id, event_kind, invocation)
            .with_timeout_ms(self.timeout.unwrap_or(config.default_hook_timeout_ms));
        if let Some(order) = self.order {
            registration = registration.with_order(order);
        }
        if let Some(message) = self.status_message {
            registration = registration.with_status_message(message);
        }
        if !self.enabled {
            registration = registration.disabled();
        }

        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> SessionConfig {
        SessionConfig::new("/srv/pai").with_default_hook_timeout_ms(9_000)
    }

    #[test]
    fn test_parse_claude_settings_shape() {
        let json = r#"{
            "permissions": { "allow": ["Bash"] },
            "hooks": {
                "SessionStart": [
                    { "hooks": [
                        { "type": "command", "id": "load-context",
                          "command": "${PAI_DIR}/hooks/load-context",
                          "args": ["--quiet"], "order": 1, "timeout": 5000 }
                    ] }
                ],
                "Stop": []
            }
        }"#;
        let settings = HooksSettings::parse(json).unwrap();
        assert_eq!(settings.hooks.len(), 2);
        assert_eq!(settings.hooks["SessionStart"][0].hooks[0].timeout, Some(5000));
    }

    #[test]
    fn test_into_registrations_expands_and_defaults() {
        let json = r#"{ "hooks": { "SessionStart": [ { "hooks": [
            { "type": "command", "id": "load-context",
              "command": "${PAI_DIR}/hooks/load-context", "args": ["--name", "$DA"],
              "order": 1, "timeout": 5000 },
            { "type": "command", "command": "${PAI_DIR}/hooks/notify.ts --voice kai" }
        ] } ] } }"#;
        let hooks = HooksSettings::parse(json)
            .unwrap()
            .into_registrations(&config())
            .unwrap();

        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[0].id, "load-context");
        assert_eq!(
            hooks[0].invocation.program,
            Path::new("/srv/pai/hooks/load-context")
        );
        assert_eq!(hooks[0].invocation.args, vec!["--name", "Kai"]);
        assert_eq!(hooks[0].order, Some(1));
        assert_eq!(hooks[0].timeout_ms, 5000);

        assert_eq!(hooks[1].id, "notify");
        assert_eq!(hooks[1].invocation.program, Path::new("/srv/pai/hooks/notify.ts"));
        assert_eq!(hooks[1].invocation.args, vec!["--voice", "kai"]);
        assert_eq!(hooks[1].order, None);
        assert_eq!(hooks[1].timeout_ms, 9_000);
    }

    #[test]
    fn test_shell_metacharacters_stay_literal() {
        let json = r#"{ "hooks": { "PreCompact": [ { "hooks": [
            { "type": "command", "command": "/bin/echo hi;rm && ls" }
        ] } ] } }"#;
        let hooks = HooksSettings::parse(json)
            .unwrap()
            .into_registrations(&config())
            .unwrap();
        assert_eq!(hooks[0].invocation.args, vec!["hi;rm", "&&", "ls"]);
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let json = r#"{ "hooks": { "Stop": [ { "hooks": [
            { "type": "command", "command": "/bin/true" }
        ] } ] } }"#;
        let err = HooksSettings::parse(json)
            .unwrap()
            .into_registrations(&config())
            .unwrap_err();
        assert!(matches!(err, KaiError::InvalidDeclaration { .. }));
    }

    #[test]
    fn test_non_command_type_is_rejected() {
        let json = r#"{ "hooks": { "SessionStart": [ { "hooks": [
            { "type": "prompt", "command": "summarize" }
        ] } ] } }"#;
        assert!(matches!(
            HooksSettings::parse(json),
            Err(KaiError::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let json = r#"{ "hooks": { "SessionEnd": [ { "hooks": [
            { "type": "command", "command": "   " }
        ] } ] } }"#;
        let err = HooksSettings::parse(json)
            .unwrap()
            .into_registrations(&config())
            .unwrap_err();
        assert!(err.to_string().contains("Empty command"));
    }

    #[test]
    fn test_disabled_and_status_message() {
        let json = r#"{ "hooks": { "SessionEnd": [ { "hooks": [
            { "type": "command", "command": "/opt/save", "enabled": false,
              "statusMessage": "Saving session" }
        ] } ] } }"#;
        let hooks = HooksSettings::parse(json)
            .unwrap()
            .into_registrations(&config())
            .unwrap();
        assert!(!hooks[0].enabled);
        assert_eq!(hooks[0].status_message.as_deref(), Some("Saving session"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let settings = HooksSettings::load(&dir.path().join("settings.json"))
            .await
            .unwrap();
        assert!(settings.hooks.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = HooksSettings::load(&path).await.unwrap_err();
        match err {
            KaiError::InvalidDeclaration { path: Some(p), .. } => {
                assert!(p.ends_with("settings.json"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
