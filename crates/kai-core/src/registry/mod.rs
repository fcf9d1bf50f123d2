//! Hook and skill registry
//!
//! The registry is assembled once at session start by a [`RegistryBuilder`]
//! and is immutable afterwards; share it as `Arc<Registry>` and read it
//! without locking.

mod loader;

pub use loader::load_registry;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::error::{KaiError, KaiResult};
use crate::event::EventKind;
use crate::hooks::HookRegistration;
use crate::matcher::TriggerSet;
use crate::skills::{MAX_TIERS, Skill, Tier};

/// A registered skill with its compiled triggers
#[derive(Debug, Clone)]
struct RegisteredSkill {
    skill: Arc<Skill>,
    triggers: TriggerSet,
}

/// Collects registrations and validates them as they arrive
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Hooks per event kind, in registration order
    hooks: BTreeMap<EventKind, Vec<HookRegistration>>,
    skills: Vec<RegisteredSkill>,
    skill_index: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook; ids must be unique per event kind
    pub fn register_hook(&mut self, hook: HookRegistration) -> KaiResult<()> {
        if hook.id.trim().is_empty() {
            return Err(KaiError::invalid_declaration(format!(
                "Hook for {} has an empty id",
                hook.event_kind
            )));
        }

        let hooks = self.hooks.entry(hook.event_kind).or_default();
        if hooks.iter().any(|h| h.id == hook.id) {
            return Err(KaiError::duplicate_hook(hook.id, hook.event_kind));
        }

        debug!("Registered {}", hook);
        hooks.push(hook);
        Ok(())
    }

    /// Register a skill after validating its tiers and compiling its triggers
    pub fn register_skill(&mut self, skill: Skill) -> KaiResult<()> {
        if skill.id.trim().is_empty() {
            return Err(KaiError::invalid_declaration("Skill has an empty id"));
        }
        if self.skill_index.contains_key(&skill.id) {
            return Err(KaiError::duplicate_skill(skill.id));
        }

        validate_tiers(&skill)?;
        let triggers = TriggerSet::compile(&skill)?;
        if triggers.is_empty() {
            debug!("Skill '{}' has no triggers and can only be expanded explicitly", skill.id);
        }

        self.skill_index.insert(skill.id.clone(), self.skills.len());
        self.skills.push(RegisteredSkill {
            skill: Arc::new(skill),
            triggers,
        });
        Ok(())
    }

    /// Freeze the registrations, fixing each event kind's dispatch order
    pub fn build(self) -> Registry {
        let hooks = self
            .hooks
            .into_iter()
            .map(|(kind, hooks)| (kind, dispatch_order(hooks)))
            .collect();

        Registry {
            hooks,
            skills: self.skills,
            skill_index: self.skill_index,
        }
    }
}

/// Sort by effective order (explicit order, else declaration index), ties by declaration index
fn dispatch_order(hooks: Vec<HookRegistration>) -> Vec<HookRegistration> {
    let mut indexed: Vec<(usize, HookRegistration)> = hooks.into_iter().enumerate().collect();
    indexed.sort_by_key(|(seq, hook)| (hook.order.unwrap_or(*seq as i64), *seq));
    indexed.into_iter().map(|(_, hook)| hook).collect()
}

/// Tiers must be declared contiguously from 0, and components need a tier 3
/// and distinct ids
fn validate_tiers(skill: &Skill) -> KaiResult<()> {
    let tiers = &skill.disclosure_tiers;
    if tiers.is_empty() {
        return Err(KaiError::invalid_tier_order(&skill.id, "no tier 0 declared"));
    }
    if tiers.len() > MAX_TIERS {
        return Err(KaiError::invalid_tier_order(
            &skill.id,
            format!("{} tiers declared, at most {} allowed", tiers.len(), MAX_TIERS),
        ));
    }
    for (position, tier) in tiers.iter().enumerate() {
        if tier.tier as usize != position {
            return Err(KaiError::invalid_tier_order(
                &skill.id,
                format!(
                    "tier {} declared at position {}; tiers must be contiguous from 0",
                    tier.tier, position
                ),
            ));
        }
    }
    if !skill.components.is_empty() && skill.max_tier() != Tier::Components {
        return Err(KaiError::invalid_tier_order(
            &skill.id,
            "components declared without tier 3",
        ));
    }
    let mut seen = HashSet::new();
    for component in &skill.components {
        if !seen.insert(component.id.as_str()) {
            return Err(KaiError::invalid_declaration(format!(
                "Skill '{}' declares component '{}' more than once",
                skill.id, component.id
            )));
        }
    }
    Ok(())
}

/// Immutable set of hooks and skills for one session
#[derive(Debug, Default)]
pub struct Registry {
    hooks: BTreeMap<EventKind, Vec<HookRegistration>>,
    skills: Vec<RegisteredSkill>,
    skill_index: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Hooks for an event kind in dispatch order; empty if none
    pub fn hooks_for(&self, kind: EventKind) -> &[HookRegistration] {
        self.hooks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of skills with a trigger occurring in the utterance, in declaration order
    pub fn skills_by_trigger(&self, utterance: &str) -> Vec<String> {
        self.skills
            .iter()
            .filter(|s| s.triggers.matches(utterance))
            .map(|s| s.skill.id.clone())
            .collect()
    }

    pub fn skill(&self, id: &str) -> Option<&Arc<Skill>> {
        self.skill_index.get(id).map(|&i| &self.skills[i].skill)
    }

    /// All skills in declaration order
    pub fn skills(&self) -> impl Iterator<Item = &Arc<Skill>> {
        self.skills.iter().map(|s| &s.skill)
    }

    /// Phrases a skill is matched on, including descriptor phrases
    pub fn trigger_phrases(&self, id: &str) -> Option<&[String]> {
        self.skill_index
            .get(id)
            .map(|&i| self.skills[i].triggers.phrases())
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// Event kinds with at least one hook, in lifecycle order
    pub fn events_with_hooks(&self) -> Vec<EventKind> {
        self.hooks
            .iter()
            .filter(|(_, hooks)| !hooks.is_empty())
            .map(|(kind, _)| *kind)
            .collect()
    }
}
