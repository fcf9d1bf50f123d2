//! Disclosure tiers and content references

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Number of tiers a skill may declare
pub const MAX_TIERS: usize = 4;

/// One layer of a skill's content
///
/// Tiers are strictly nested: tier N is only ever loaded after tier N-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Short summary, always resident
    Descriptor = 0,
    /// Primary instructions
    Instructions = 1,
    /// Extended methodology
    Methodology = 2,
    /// Auxiliary components and resources
    Components = 3,
}

impl Tier {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Tier::Descriptor),
            1 => Some(Tier::Instructions),
            2 => Some(Tier::Methodology),
            3 => Some(Tier::Components),
            _ => None,
        }
    }

    /// The tier after this one, if any
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The tier that must be loaded before this one
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Tiers from `Descriptor` up to and including `self`
    pub fn up_to(self) -> impl Iterator<Item = Tier> {
        (0..=self.index()).filter_map(Self::from_index)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Descriptor => "descriptor",
            Tier::Instructions => "instructions",
            Tier::Methodology => "methodology",
            Tier::Components => "components",
        };
        write!(f, "tier {} ({})", self.index(), name)
    }
}

/// Where a content blob lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContentRef {
    /// Content held in memory
    Inline(String),
    /// A whole file
    File(PathBuf),
    /// A markdown file whose YAML frontmatter is stripped on load
    Body(PathBuf),
}

impl ContentRef {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ContentRef::Inline(_) => None,
            ContentRef::File(path) | ContentRef::Body(path) => Some(path),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentRef::Inline(text) => write!(f, "inline ({} bytes)", text.len()),
            ContentRef::File(path) | ContentRef::Body(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A declared tier: its index and where its content lives
///
/// The index is kept raw so malformed declarations can be rejected at
/// registration instead of being unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRef {
    pub tier: u8,
    pub source: ContentRef,
}

impl TierRef {
    pub fn new(tier: u8, source: ContentRef) -> Self {
        Self { tier, source }
    }
}

/// A Tier 3 resource, loaded individually on reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub source: ContentRef,
}

impl Component {
    pub fn new(id: impl Into<String>, source: ContentRef) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}
