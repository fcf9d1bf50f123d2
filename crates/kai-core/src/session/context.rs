//! Per-session state
//!
//! Holds the skill tiers loaded so far and the hook execution history for one
//! assistant session. Appends are serialized by a single lock; readers take a
//! [`SessionSnapshot`] cloned under that lock, so they never observe a
//! partial update.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{KaiError, KaiResult};
use crate::hooks::ExecutionResult;
use crate::skills::Tier;

/// One tier of one skill entering the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub skill_id: String,
    pub activated_at_tier: Tier,
    pub timestamp: DateTime<Utc>,
}

impl ActivationRecord {
    pub fn new(skill_id: impl Into<String>, tier: Tier) -> Self {
        Self {
            skill_id: skill_id.into(),
            activated_at_tier: tier,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    activations: Vec<ActivationRecord>,
    executions: Vec<ExecutionResult>,
    /// skill id -> tier -> content
    tiers: HashMap<String, BTreeMap<Tier, Arc<str>>>,
    /// (skill id, component id) -> content
    components: HashMap<(String, String), Arc<str>>,
}

/// Point-in-time copy of a session's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub activations: Vec<ActivationRecord>,
    pub executions: Vec<ExecutionResult>,
    /// Highest loaded tier per skill
    pub loaded_tiers: BTreeMap<String, Tier>,
    /// Loaded components per skill, sorted
    pub loaded_components: BTreeMap<String, Vec<String>>,
}

/// State for the lifetime of one assistant session
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    state: Mutex<SessionState>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Highest tier of a skill loaded so far
    pub fn loaded_tier(&self, skill_id: &str) -> Option<Tier> {
        self.state
            .lock()
            .tiers
            .get(skill_id)
            .and_then(|tiers| tiers.keys().next_back().copied())
    }

    /// Cached content of a loaded tier
    pub fn tier_content(&self, skill_id: &str, tier: Tier) -> Option<Arc<str>> {
        self.state
            .lock()
            .tiers
            .get(skill_id)
            .and_then(|tiers| tiers.get(&tier).cloned())
    }

    /// Record a freshly loaded tier
    ///
    /// Returns the new record, or `None` if the tier was already loaded. Fails
    /// if the tier below has not been loaded.
    pub fn record_tier(
        &self,
        skill_id: &str,
        tier: Tier,
        content: Arc<str>,
    ) -> KaiResult<Option<ActivationRecord>> {
        let mut state = self.state.lock();
        let loaded = state.tiers.entry(skill_id.to_string()).or_default();

        if loaded.contains_key(&tier) {
            return Ok(None);
        }
        if let Some(previous) = tier.previous() {
            if !loaded.contains_key(&previous) {
                return Err(KaiError::tier_skipped(skill_id, tier.index()));
            }
        }

        loaded.insert(tier, content);
        let record = ActivationRecord::new(skill_id, tier);
        state.activations.push(record.clone());
        Ok(Some(record))
    }

    /// Cached content of a loaded component
    pub fn component_content(&self, skill_id: &str, component_id: &str) -> Option<Arc<str>> {
        self.state
            .lock()
            .components
            .get(&(skill_id.to_string(), component_id.to_string()))
            .cloned()
    }

    /// Record a loaded component; returns false if it was already present
    pub fn record_component(&self, skill_id: &str, component_id: &str, content: Arc<str>) -> bool {
        let mut state = self.state.lock();
        let key = (skill_id.to_string(), component_id.to_string());
        if state.components.contains_key(&key) {
            return false;
        }
        state.components.insert(key, content);
        true
    }

    pub fn append_executions(&self, results: impl IntoIterator<Item = ExecutionResult>) {
        self.state.lock().executions.extend(results);
    }

    pub fn activation_count(&self) -> usize {
        self.state.lock().activations.len()
    }

    /// Records appended after the first `start`
    pub fn activations_since(&self, start: usize) -> Vec<ActivationRecord> {
        self.state
            .lock()
            .activations
            .get(start..)
            .map(<[ActivationRecord]>::to_vec)
            .unwrap_or_default()
    }

    pub fn activations(&self) -> Vec<ActivationRecord> {
        self.state.lock().activations.clone()
    }

    pub fn executions(&self) -> Vec<ExecutionResult> {
        self.state.lock().executions.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();

        let loaded_tiers = state
            .tiers
            .iter()
            .filter_map(|(skill, tiers)| {
                tiers
                    .keys()
                    .next_back()
                    .map(|tier| (skill.clone(), *tier))
            })
            .collect();

        let mut loaded_components: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (skill, component) in state.components.keys() {
            loaded_components
                .entry(skill.clone())
                .or_default()
                .push(component.clone());
        }
        for components in loaded_components.values_mut() {
            components.sort();
        }

        SessionSnapshot {
            session_id: self.session_id.clone(),
            activations: state.activations.clone(),
            executions: state.executions.clone(),
            loaded_tiers,
            loaded_components,
        }
    }

    /// Drop all state; used when the session ends
    pub fn reset(&self) {
        *self.state.lock() = SessionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn text(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn test_record_tier_is_idempotent() {
        let context = SessionContext::new("s");
        assert!(context
            .record_tier("fabric", Tier::Descriptor, text("d"))
            .unwrap()
            .is_some());
        assert!(context
            .record_tier("fabric", Tier::Descriptor, text("d"))
            .unwrap()
            .is_none());
        assert_eq!(context.activations().len(), 1);
    }

    #[test]
    fn test_record_tier_rejects_skipping() {
        let context = SessionContext::new("s");
        context.record_tier("fabric", Tier::Descriptor, text("d")).unwrap();

        let err = context
            .record_tier("fabric", Tier::Methodology, text("m"))
            .unwrap_err();
        assert!(matches!(err, KaiError::TierSkipped { tier: 2, .. }));
        assert_eq!(context.loaded_tier("fabric"), Some(Tier::Descriptor));
        assert_eq!(context.tier_content("fabric", Tier::Methodology), None);
    }

    #[test]
    fn test_instructions_require_descriptor() {
        let context = SessionContext::new("s");
        let err = context
            .record_tier("fabric", Tier::Instructions, text("i"))
            .unwrap_err();
        assert!(matches!(err, KaiError::TierSkipped { .. }));
        assert_eq!(context.loaded_tier("fabric"), None);
    }

    #[test]
    fn test_components_recorded_once() {
        let context = SessionContext::new("s");
        assert!(context.record_component("fabric", "summarize", text("x")));
        assert!(!context.record_component("fabric", "summarize", text("y")));
        assert_eq!(
            context.component_content("fabric", "summarize").as_deref(),
            Some("x")
        );
    }

    #[test]
    fn test_snapshot_and_reset() {
        let context = SessionContext::new("s1");
        context.record_tier("a", Tier::Descriptor, text("d")).unwrap();
        context.record_tier("a", Tier::Instructions, text("i")).unwrap();
        context.record_tier("b", Tier::Descriptor, text("d")).unwrap();
        context.record_component("a", "z", text("z"));
        context.record_component("a", "c", text("c"));
        context.append_executions([ExecutionResult::skipped(
            "h",
            EventKind::SessionStart,
            "disabled",
        )]);

        let snapshot = context.snapshot();
        assert_eq!(snapshot.session_id, "s1");
        assert_eq!(snapshot.activations.len(), 3);
        assert_eq!(snapshot.executions.len(), 1);
        assert_eq!(snapshot.loaded_tiers["a"], Tier::Instructions);
        assert_eq!(snapshot.loaded_tiers["b"], Tier::Descriptor);
        assert_eq!(snapshot.loaded_components["a"], vec!["c", "z"]);

        context.reset();
        let snapshot = context.snapshot();
        assert!(snapshot.activations.is_empty());
        assert!(snapshot.executions.is_empty());
        assert!(snapshot.loaded_tiers.is_empty());
        assert_eq!(context.loaded_tier("a"), None);
    }

    #[test]
    fn test_concurrent_appends() {
        let context = Arc::new(SessionContext::new("s"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let context = Arc::clone(&context);
                std::thread::spawn(move || {
                    let skill = format!("skill-{}", i);
                    context.record_tier(&skill, Tier::Descriptor, text("d")).unwrap();
                    context.record_tier(&skill, Tier::Instructions, text("i")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(context.activations().len(), 16);
        assert_eq!(context.snapshot().loaded_tiers.len(), 8);
    }
}
