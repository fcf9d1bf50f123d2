//! Event to plan matching
//!
//! Lifecycle events map to the registry's hook order verbatim. Prompt events
//! additionally select skills whose triggers occur in the utterance. Matching
//! is deterministic: case-insensitive containment or pattern search, no
//! scoring and no exclusivity.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::error::{KaiError, KaiResult};
use crate::event::{Event, EventKind};
use crate::hooks::HookRegistration;
use crate::registry::Registry;
use crate::skills::{Skill, SkillTrigger};

/// Quoted phrase inside a descriptor, e.g. `USE WHEN user says 'research'`
static DESCRIPTOR_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s(\[,:;])['"‘“]([^'"‘’“”]+)['"’”]"#).expect("descriptor phrase regex")
});

/// Compiled activation triggers of one skill
#[derive(Debug, Clone)]
pub struct TriggerSet {
    /// Lowercased phrases, declared and descriptor-derived
    phrases: Vec<String>,
    patterns: Vec<Regex>,
}

impl TriggerSet {
    /// Compile a skill's triggers; invalid patterns are rejected
    pub fn compile(skill: &Skill) -> KaiResult<Self> {
        let mut phrases = Vec::new();
        let mut patterns = Vec::new();

        for trigger in &skill.triggers {
            match trigger {
                SkillTrigger::Phrase(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        return Err(KaiError::invalid_trigger(
                            &skill.id,
                            trigger.to_string(),
                            "empty phrase would match every utterance",
                        ));
                    }
                    phrases.push(text.to_lowercase());
                }
                SkillTrigger::Pattern(pattern) => {
                    if pattern.trim().is_empty() {
                        return Err(KaiError::invalid_trigger(
                            &skill.id,
                            trigger.to_string(),
                            "empty pattern would match every utterance",
                        ));
                    }
                    let regex = RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| {
                            KaiError::invalid_trigger(&skill.id, trigger.to_string(), e.to_string())
                        })?;
                    patterns.push(regex);
                }
            }
        }

        for phrase in descriptor_phrases(&skill.descriptor) {
            if !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }

        Ok(Self { phrases, patterns })
    }

    /// Whether any trigger occurs in the utterance
    pub fn matches(&self, utterance: &str) -> bool {
        let lower = utterance.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
            || self.patterns.iter().any(|re| re.is_match(utterance))
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty() && self.patterns.is_empty()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

/// Quoted phrases in a descriptor, lowercased
pub fn descriptor_phrases(descriptor: &str) -> Vec<String> {
    DESCRIPTOR_PHRASE
        .captures_iter(descriptor)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Hooks to run and skills to activate for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub event_kind: EventKind,
    pub hooks: Vec<HookRegistration>,
    /// Skill ids in registry declaration order
    pub skills: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty() && self.skills.is_empty()
    }
}

/// Translates events into plans
#[derive(Debug, Clone)]
pub struct Matcher {
    registry: Arc<Registry>,
}

impl Matcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Build the plan for an event
    pub fn plan(&self, event: &Event) -> Plan {
        let hooks = self.registry.hooks_for(event.kind).to_vec();
        let skills = event
            .utterance()
            .map(|utterance| self.match_utterance(utterance))
            .unwrap_or_default();

        debug!(
            "Plan for {}: {} hook(s), {} skill(s)",
            event.kind,
            hooks.len(),
            skills.len()
        );

        Plan {
            event_kind: event.kind,
            hooks,
            skills,
        }
    }

    /// Skills that would activate for an utterance
    pub fn match_utterance(&self, utterance: &str) -> Vec<String> {
        let skills = self.registry.skills_by_trigger(utterance);
        if !skills.is_empty() {
            debug!("Utterance matched skills: {:?}", skills);
        }
        skills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Invocation;
    use crate::registry::RegistryBuilder;

    fn fabric() -> Skill {
        Skill::new("fabric", "Prompt pattern library").with_triggers(["pattern"])
    }

    fn matcher(skills: Vec<Skill>) -> Matcher {
        let mut builder = RegistryBuilder::new();
        for skill in skills {
            builder.register_skill(skill).unwrap();
        }
        Matcher::new(Arc::new(builder.build()))
    }

    #[test]
    fn test_phrase_matches_any_casing() {
        let triggers = TriggerSet::compile(
            &Skill::new("research", "Research").with_triggers(["research"]),
        )
        .unwrap();
        assert!(triggers.matches("Please RESEARCH quantum dots"));
        assert!(triggers.matches("do some Research"));
        assert!(!triggers.matches("what's the weather"));
    }

    #[test]
    fn test_pattern_is_case_insensitive() {
        let triggers = TriggerSet::compile(
            &Skill::new("lookup", "Lookup").with_triggers(["regex:\\blook\\s+up\\b"]),
        )
        .unwrap();
        assert!(triggers.matches("Can you LOOK  UP the docs"));
        assert!(!triggers.matches("lookup table"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = TriggerSet::compile(&Skill::new("bad", "Bad").with_triggers(["regex:(unclosed"]))
            .unwrap_err();
        assert!(matches!(err, KaiError::InvalidTrigger { .. }));
    }

    #[test]
    fn test_empty_phrase_is_rejected() {
        let err = TriggerSet::compile(&Skill::new("bad", "Bad").with_trigger(SkillTrigger::phrase("  ")))
            .unwrap_err();
        assert!(matches!(err, KaiError::InvalidTrigger { .. }));
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        for trigger in ["regex:", "regex:   "] {
            let err = TriggerSet::compile(&Skill::new("greedy", "Greedy").with_triggers([trigger]))
                .unwrap_err();
            assert!(matches!(err, KaiError::InvalidTrigger { .. }));
        }

        let mut builder = RegistryBuilder::new();
        assert!(
            builder
                .register_skill(Skill::new("greedy", "Greedy").with_triggers(["regex:"]))
                .is_err()
        );
        assert!(builder.build().skills_by_trigger("what's the weather").is_empty());
    }

    #[test]
    fn test_descriptor_phrases() {
        assert_eq!(
            descriptor_phrases("Research. USE WHEN user says 'research', \"Investigate\" or (‘dig into’)"),
            vec!["research", "investigate", "dig into"]
        );
        assert!(descriptor_phrases("The user's own notes").is_empty());
    }

    #[test]
    fn test_descriptor_phrases_act_as_triggers() {
        let triggers =
            TriggerSet::compile(&Skill::new("research", "USE WHEN user says 'investigate'")).unwrap();
        assert!(!triggers.is_empty());
        assert!(triggers.matches("Investigate this outage"));
    }

    #[test]
    fn test_fabric_scenario() {
        let matcher = matcher(vec![fabric()]);
        assert_eq!(
            matcher.plan(&Event::prompt("apply a pattern to this text")).skills,
            vec!["fabric"]
        );
        assert!(matcher.plan(&Event::prompt("what's the weather")).skills.is_empty());
    }

    #[test]
    fn test_multiple_skills_in_declaration_order() {
        let matcher = matcher(vec![
            Skill::new("writing", "Writing").with_triggers(["text"]),
            fabric(),
            Skill::new("unrelated", "Other").with_triggers(["weather"]),
        ]);
        assert_eq!(
            matcher.match_utterance("apply a pattern to this text"),
            vec!["writing", "fabric"]
        );
    }

    #[test]
    fn test_lifecycle_event_plans_hooks_only() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_hook(HookRegistration::new(
                "load",
                EventKind::SessionStart,
                Invocation::new("/bin/true"),
            ))
            .unwrap();
        builder.register_skill(fabric()).unwrap();
        let matcher = Matcher::new(Arc::new(builder.build()));

        let start = matcher.plan(&Event::new(
            EventKind::SessionStart,
            serde_json::json!({ "prompt": "pattern" }),
        ));
        assert_eq!(start.hooks.len(), 1);
        assert!(start.skills.is_empty());

        let prompt = matcher.plan(&Event::prompt("pattern please"));
        assert!(prompt.hooks.is_empty());
        assert_eq!(prompt.skills, vec!["fabric"]);
        assert!(!prompt.is_empty());
    }
}
