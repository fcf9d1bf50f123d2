//! Constructor methods for KaiError

use super::types::KaiError;
use crate::event::EventKind;

impl KaiError {
    /// Create a duplicate hook error
    pub fn duplicate_hook(hook_id: impl Into<String>, event: EventKind) -> Self {
        Self::DuplicateHook {
            hook_id: hook_id.into(),
            event,
        }
    }

    /// Create a duplicate skill error
    pub fn duplicate_skill(skill_id: impl Into<String>) -> Self {
        Self::DuplicateSkill {
            skill_id: skill_id.into(),
        }
    }

    /// Create an invalid tier order error
    pub fn invalid_tier_order(skill_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTierOrder {
            skill_id: skill_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid trigger error
    pub fn invalid_trigger(
        skill_id: impl Into<String>,
        trigger: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidTrigger {
            skill_id: skill_id.into(),
            trigger: trigger.into(),
            message: message.into(),
        }
    }

    /// Create an invalid declaration error
    pub fn invalid_declaration(message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            message: message.into(),
            path: None,
        }
    }

    /// Create an invalid declaration error pointing at a file
    pub fn invalid_declaration_at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a content load error
    pub fn content_load(skill_id: impl Into<String>, tier: u8, message: impl Into<String>) -> Self {
        Self::ContentLoad {
            skill_id: skill_id.into(),
            tier,
            message: message.into(),
        }
    }

    pub fn tier_skipped(skill_id: impl Into<String>, tier: u8) -> Self {
        KaiError::TierSkipped {
            skill_id: skill_id.into(),
            tier,
        }
    }

    /// Create an unknown skill error
    pub fn unknown_skill(skill_id: impl Into<String>) -> Self {
        Self::UnknownSkill {
            skill_id: skill_id.into(),
        }
    }

    /// Create an unknown component error
    pub fn unknown_component(
        skill_id: impl Into<String>,
        component_id: impl Into<String>,
    ) -> Self {
        Self::UnknownComponent {
            skill_id: skill_id.into(),
            component_id: component_id.into(),
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
        }
    }

    /// Create an IO error with path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }
}
