//! Skills
//!
//! A skill is a capability package with a short descriptor, activation
//! triggers, and content split into disclosure tiers. Skills are discovered
//! from disk at startup, selected by the matcher, and materialized into a
//! session tier by tier by the [`DisclosureLoader`].

pub mod disclosure;
pub mod discovery;
pub mod types;

pub use disclosure::{
    ComponentLoad, ContentSource, Disclosure, DisclosureLoader, DisclosureState, FsContentSource,
    LoadedTier,
};
pub use types::{
    Component, ContentRef, MAX_TIERS, Skill, SkillSource, SkillTrigger, Tier, TierRef,
};
