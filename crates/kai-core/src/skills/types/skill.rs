//! Main Skill type definition

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::tier::{Component, ContentRef, Tier, TierRef};
use super::trigger::SkillTrigger;

/// Where a skill was declared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillSource {
    /// Built in code
    #[default]
    Inline,
    /// Discovered in a skill directory
    Directory(PathBuf),
}

/// A modular capability package
///
/// Skills live on disk as `skills/<id>/SKILL.md`:
/// ```markdown
/// ---
/// name: research
/// description: Multi-source research. USE WHEN user says 'research' or 'investigate'
/// triggers:
///   - find out about
///   - "regex:\\blook\\s+up\\b"
/// ---
///
/// Primary instructions (tier 1)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    /// Short summary, always visible to the matcher
    pub descriptor: String,
    pub triggers: Vec<SkillTrigger>,
    /// Declared tiers in declaration order; tier 0 is the descriptor
    pub disclosure_tiers: Vec<TierRef>,
    /// Tier 3 resources
    pub components: Vec<Component>,
    #[serde(default)]
    pub source: SkillSource,
}

impl Skill {
    /// Create a skill whose tier 0 is its descriptor
    pub fn new(id: impl Into<String>, descriptor: impl Into<String>) -> Self {
        let descriptor = descriptor.into();
        Self {
            id: id.into(),
            disclosure_tiers: vec![TierRef::new(0, ContentRef::Inline(descriptor.clone()))],
            descriptor,
            triggers: Vec::new(),
            components: Vec::new(),
            source: SkillSource::Inline,
        }
    }

    /// Add a trigger
    pub fn with_trigger(mut self, trigger: SkillTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Add several declared triggers (`regex:` selects a pattern)
    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.triggers
            .extend(triggers.into_iter().map(|t| SkillTrigger::parse(t.as_ref())));
        self
    }

    /// Append the next tier
    pub fn with_tier(mut self, source: ContentRef) -> Self {
        let next = self.disclosure_tiers.len() as u8;
        self.disclosure_tiers.push(TierRef::new(next, source));
        self
    }

    /// Declare a tier at an explicit index
    pub fn with_tier_at(mut self, tier: u8, source: ContentRef) -> Self {
        self.disclosure_tiers.push(TierRef::new(tier, source));
        self
    }

    /// Add a Tier 3 component
    pub fn with_component(mut self, id: impl Into<String>, source: ContentRef) -> Self {
        self.components.push(Component::new(id, source));
        self
    }

    /// Set source
    pub fn with_source(mut self, source: SkillSource) -> Self {
        self.source = source;
        self
    }

    /// Where the content of `tier` lives
    pub fn tier_source(&self, tier: Tier) -> Option<&ContentRef> {
        self.disclosure_tiers
            .iter()
            .find(|t| t.tier == tier.index())
            .map(|t| &t.source)
    }

    /// Highest declared tier
    pub fn max_tier(&self) -> Tier {
        self.disclosure_tiers
            .iter()
            .filter_map(|t| Tier::from_index(t.tier))
            .max()
            .unwrap_or(Tier::Descriptor)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn tier_count(&self) -> usize {
        self.disclosure_tiers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_declares_descriptor_tier() {
        let skill = Skill::new("research", "Multi-source research");
        assert_eq!(skill.tier_count(), 1);
        assert_eq!(
            skill.tier_source(Tier::Descriptor),
            Some(&ContentRef::Inline("Multi-source research".into()))
        );
        assert_eq!(skill.max_tier(), Tier::Descriptor);
    }

    #[test]
    fn test_builder() {
        let skill = Skill::new("fabric", "Prompt patterns")
            .with_triggers(["pattern", "regex:\\bfabric\\b"])
            .with_tier(ContentRef::Inline("instructions".into()))
            .with_tier(ContentRef::File("/s/fabric/METHODOLOGY.md".into()))
            .with_tier(ContentRef::Inline("components".into()))
            .with_component("summarize", ContentRef::File("/s/fabric/components/summarize.md".into()));

        assert_eq!(skill.triggers.len(), 2);
        assert!(matches!(skill.triggers[1], SkillTrigger::Pattern(_)));
        assert_eq!(skill.max_tier(), Tier::Components);
        assert_eq!(skill.disclosure_tiers[2].tier, 2);
        assert!(skill.component("summarize").is_some());
        assert!(skill.component("extract").is_none());
    }
}
