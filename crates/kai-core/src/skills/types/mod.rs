//! Skill type definitions

mod skill;
mod tier;
mod trigger;

pub use skill::{Skill, SkillSource};
pub use tier::{Component, ContentRef, MAX_TIERS, Tier, TierRef};
pub use trigger::{REGEX_PREFIX, SkillTrigger};
