//! Skill trigger types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix marking a declared trigger as a regular expression
pub const REGEX_PREFIX: &str = "regex:";

/// Skill trigger definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillTrigger {
    /// Case-insensitive substring of the utterance
    Phrase(String),

    /// Case-insensitive regular expression over the utterance
    Pattern(String),
}

impl SkillTrigger {
    /// Parse a declared trigger; `regex:` selects a pattern
    pub fn parse(declared: &str) -> Self {
        match declared.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => Self::Pattern(pattern.trim().to_string()),
            None => Self::Phrase(declared.trim().to_string()),
        }
    }

    pub fn phrase(text: impl Into<String>) -> Self {
        Self::Phrase(text.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }
}

impl fmt::Display for SkillTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phrase(text) => write!(f, "\"{}\"", text),
            Self::Pattern(pattern) => write!(f, "{}{}", REGEX_PREFIX, pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(SkillTrigger::parse("research"), SkillTrigger::phrase("research"));
        assert_eq!(
            SkillTrigger::parse("regex:^fab(ric)?\\b"),
            SkillTrigger::pattern("^fab(ric)?\\b")
        );
    }

    #[test]
    fn test_display_round_trips_declared_form() {
        let trigger = SkillTrigger::parse("regex:\\bresearch\\b");
        assert_eq!(trigger.to_string(), "regex:\\bresearch\\b");
        assert_eq!(SkillTrigger::phrase("apply").to_string(), "\"apply\"");
    }
}
