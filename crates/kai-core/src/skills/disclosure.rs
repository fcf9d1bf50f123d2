//! Progressive disclosure of skill content
//!
//! A skill enters the session at its descriptor and first-level instructions.
//! Deeper tiers load only when asked for, one tier at a time, and every tier
//! is loaded at most once per session:
//!
//! ```text
//! NotLoaded -> Loaded(0) -> Loaded(1) -> Loaded(2) -> Loaded(3)
//! ```
//!
//! Components are tier 3 resources and are loaded individually on reference.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::discovery::split_frontmatter;
use super::types::{ContentRef, Skill, Tier};
use crate::error::{KaiError, KaiResult};
use crate::session::{ActivationRecord, SessionContext};

/// Reads content blobs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load(&self, source: &ContentRef) -> io::Result<String>;
}

/// Reads content from the file system
///
/// Missing, non-UTF-8 and empty files are errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentSource;

impl FsContentSource {
    async fn read(path: &Path) -> io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        String::from_utf8(bytes).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not valid UTF-8: {}", path.display(), e),
            )
        })
    }

    fn non_empty(path: &Path, content: String) -> io::Result<String> {
        if content.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} has no content", path.display()),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn load(&self, source: &ContentRef) -> io::Result<String> {
        match source {
            ContentRef::Inline(text) => Ok(text.clone()),
            ContentRef::File(path) => {
                let content = Self::read(path).await?;
                Self::non_empty(path, content)
            }
            ContentRef::Body(path) => {
                let content = Self::read(path).await?;
                let (_, body) = split_frontmatter(&content);
                Self::non_empty(path, body.trim_start_matches(['\r', '\n']).to_string())
            }
        }
    }
}

/// How far a skill has been disclosed in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "tier", rename_all = "snake_case")]
pub enum DisclosureState {
    NotLoaded,
    Loaded(Tier),
}

impl DisclosureState {
    /// Current state of a skill in a session
    pub fn of(context: &SessionContext, skill_id: &str) -> Self {
        context
            .loaded_tier(skill_id)
            .map_or(Self::NotLoaded, Self::Loaded)
    }

    /// The only tier that may be loaded next
    pub fn next(self) -> Option<Tier> {
        match self {
            Self::NotLoaded => Some(Tier::Descriptor),
            Self::Loaded(tier) => tier.next(),
        }
    }

    pub fn has_loaded(self, tier: Tier) -> bool {
        self >= Self::Loaded(tier)
    }
}

/// A tier materialized by one loader call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTier {
    pub tier: Tier,
    pub content: Arc<str>,
}

/// Result of activating or expanding a skill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    pub skill_id: String,
    /// State after the call
    pub state: DisclosureState,
    /// Tiers newly loaded by this call, lowest first; empty when nothing changed
    pub loaded: Vec<LoadedTier>,
    pub records: Vec<ActivationRecord>,
}

impl Disclosure {
    pub fn is_noop(&self) -> bool {
        self.loaded.is_empty()
    }
}

/// Result of referencing a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLoad {
    pub skill_id: String,
    pub component_id: String,
    pub content: Arc<str>,
    pub newly_loaded: bool,
    /// Tier expansion needed to reach tier 3
    pub disclosure: Disclosure,
}

/// Materializes skill tiers into a session on demand
#[derive(Clone)]
pub struct DisclosureLoader {
    source: Arc<dyn ContentSource>,
}

impl DisclosureLoader {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// First activation: descriptor plus primary instructions
    pub async fn activate(&self, skill: &Skill, context: &SessionContext) -> KaiResult<Disclosure> {
        let target = skill.max_tier().min(Tier::Instructions);
        self.expand(skill, target, context).await
    }

    /// Load every tier up to `target` that is not loaded yet, in order
    ///
    /// On failure the skill stays at the last tier that loaded successfully.
    pub async fn expand(
        &self,
        skill: &Skill,
        target: Tier,
        context: &SessionContext,
    ) -> KaiResult<Disclosure> {
        if target > skill.max_tier() {
            return Err(KaiError::content_load(
                &skill.id,
                target.index(),
                format!("skill declares tiers up to {}", skill.max_tier().index()),
            ));
        }

        let mut state = DisclosureState::of(context, &skill.id);
        let mut loaded = Vec::new();
        let mut records = Vec::new();

        while !state.has_loaded(target) {
            let Some(tier) = state.next() else { break };
            let content = self.load_tier(skill, tier).await.inspect_err(|e| {
                warn!("{}", e);
            })?;

            if let Some(record) = context.record_tier(&skill.id, tier, Arc::clone(&content))? {
                debug!("Loaded {} of skill '{}'", tier, skill.id);
                records.push(record);
                loaded.push(LoadedTier { tier, content });
            }
            state = DisclosureState::Loaded(tier);
        }

        Ok(Disclosure {
            skill_id: skill.id.clone(),
            state,
            loaded,
            records,
        })
    }

    /// Load a component, first expanding the skill to tier 3
    pub async fn reference_component(
        &self,
        skill: &Skill,
        component_id: &str,
        context: &SessionContext,
    ) -> KaiResult<ComponentLoad> {
        let component = skill
            .component(component_id)
            .ok_or_else(|| KaiError::unknown_component(&skill.id, component_id))?;

        let disclosure = self.expand(skill, Tier::Components, context).await?;

        if let Some(content) = context.component_content(&skill.id, component_id) {
            return Ok(ComponentLoad {
                skill_id: skill.id.clone(),
                component_id: component_id.to_string(),
                content,
                newly_loaded: false,
                disclosure,
            });
        }

        let content: Arc<str> = self
            .source
            .load(&component.source)
            .await
            .map_err(|e| {
                KaiError::content_load(
                    &skill.id,
                    Tier::Components.index(),
                    format!("component '{}': {}", component_id, e),
                )
            })
            .inspect_err(|e| warn!("{}", e))?
            .into();

        let newly_loaded = context.record_component(&skill.id, component_id, Arc::clone(&content));
        debug!("Loaded component '{}' of skill '{}'", component_id, skill.id);

        Ok(ComponentLoad {
            skill_id: skill.id.clone(),
            component_id: component_id.to_string(),
            content,
            newly_loaded,
            disclosure,
        })
    }

    /// Components of `skill` named in `content`, without loading them
    pub fn referenced_components(skill: &Skill, content: &str) -> Vec<String> {
        let lower = content.to_lowercase();
        skill
            .components
            .iter()
            .filter(|c| lower.contains(&c.id.to_lowercase()))
            .map(|c| c.id.clone())
            .collect()
    }

    async fn load_tier(&self, skill: &Skill, tier: Tier) -> KaiResult<Arc<str>> {
        // Tier 0 is resident in the registry
        if tier == Tier::Descriptor {
            return Ok(Arc::from(skill.descriptor.as_str()));
        }

        let source = skill.tier_source(tier).ok_or_else(|| {
            KaiError::content_load(&skill.id, tier.index(), "tier not declared")
        })?;
        self.source
            .load(source)
            .await
            .map(Arc::from)
            .map_err(|e| KaiError::content_load(&skill.id, tier.index(), e.to_string()))
    }
}
