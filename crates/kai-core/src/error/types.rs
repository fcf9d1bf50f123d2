//! Core error type for Kai

use thiserror::Error;

use crate::event::EventKind;

/// Result type alias for Kai operations
pub type KaiResult<T> = Result<T, KaiError>;

/// Main error type for Kai
#[derive(Error, Debug, Clone)]
pub enum KaiError {
    /// A hook id was registered twice for the same event kind
    #[error("Duplicate hook '{hook_id}' for event {event}")]
    DuplicateHook { hook_id: String, event: EventKind },

    /// A skill id was registered twice
    #[error("Duplicate skill '{skill_id}'")]
    DuplicateSkill { skill_id: String },

    /// Skill tiers are not contiguous starting at tier 0
    #[error("Invalid tier order for skill '{skill_id}': {message}")]
    InvalidTierOrder { skill_id: String, message: String },

    /// A skill trigger could not be compiled
    #[error("Invalid trigger '{trigger}' for skill '{skill_id}': {message}")]
    InvalidTrigger {
        skill_id: String,
        trigger: String,
        message: String,
    },

    /// A hook or skill declaration is malformed
    #[error("Invalid declaration: {message}")]
    InvalidDeclaration {
        message: String,
        path: Option<String>,
    },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// A skill content blob is missing or malformed
    #[error("Failed to load tier {tier} of skill '{skill_id}': {message}")]
    ContentLoad {
        skill_id: String,
        tier: u8,
        message: String,
    },

    /// A tier was requested before the tier below it was loaded
    #[error("Cannot load tier {tier} of skill '{skill_id}' before the tier below it")]
    TierSkipped { skill_id: String, tier: u8 },

    /// A skill id is not present in the registry
    #[error("Unknown skill '{skill_id}'")]
    UnknownSkill { skill_id: String },

    /// A component id is not declared by the skill
    #[error("Skill '{skill_id}' has no component '{component_id}'")]
    UnknownComponent {
        skill_id: String,
        component_id: String,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },
}

impl KaiError {
    /// Stable error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            KaiError::DuplicateHook { .. } => "KAI_DUPLICATE_HOOK",
            KaiError::DuplicateSkill { .. } => "KAI_DUPLICATE_SKILL",
            KaiError::InvalidTierOrder { .. } => "KAI_INVALID_TIER_ORDER",
            KaiError::InvalidTrigger { .. } => "KAI_INVALID_TRIGGER",
            KaiError::InvalidDeclaration { .. } => "KAI_INVALID_DECLARATION",
            KaiError::Config { .. } => "KAI_CONFIG",
            KaiError::ContentLoad { .. } => "KAI_CONTENT_LOAD",
            KaiError::TierSkipped { .. } => "KAI_TIER_SKIPPED",
            KaiError::UnknownSkill { .. } => "KAI_UNKNOWN_SKILL",
            KaiError::UnknownComponent { .. } => "KAI_UNKNOWN_COMPONENT",
            KaiError::Io { .. } => "KAI_IO",
            KaiError::Json { .. } => "KAI_JSON",
        }
    }

    /// Whether this error must abort session startup
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            KaiError::DuplicateHook { .. }
                | KaiError::DuplicateSkill { .. }
                | KaiError::InvalidTierOrder { .. }
                | KaiError::InvalidTrigger { .. }
                | KaiError::InvalidDeclaration { .. }
                | KaiError::Config { .. }
        )
    }
}

impl From<std::io::Error> for KaiError {
    fn from(err: std::io::Error) -> Self {
        KaiError::io(err.to_string())
    }
}

impl From<serde_json::Error> for KaiError {
    fn from(err: serde_json::Error) -> Self {
        KaiError::json(err.to_string())
    }
}
