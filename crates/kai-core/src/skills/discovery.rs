//! Skill discovery from the file system
//!
//! Each skill is a directory under the skills root:
//!
//! ```text
//! skills/
//!   research/
//!     SKILL.md          frontmatter (tier 0) + body (tier 1)
//!     METHODOLOGY.md    optional, tier 2
//!     components/       optional, tier 3 resources (id = file stem)
//! ```
//!
//! Only file locations are recorded here. Content beyond the descriptor is read
//! lazily by the disclosure loader.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::types::{ContentRef, Skill, SkillSource};
use crate::error::{KaiError, KaiResult};

pub const SKILL_FILE: &str = "SKILL.md";
pub const METHODOLOGY_FILE: &str = "METHODOLOGY.md";
pub const COMPONENTS_DIR: &str = "components";

/// Parsed skill frontmatter
#[derive(Debug, Default, Deserialize)]
pub struct SkillFrontmatter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// Split a markdown document into its YAML frontmatter and body
pub(crate) fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let content = content.trim_start_matches('\u{feff}');
    let Some(rest) = content.strip_prefix("---") else {
        return (None, content);
    };
    let Some(rest) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, content)
}

/// Discover all skills under `dir`, ordered by directory name
///
/// A missing directory declares no skills. Subdirectories without a
/// `SKILL.md` are ignored.
pub async fn discover(dir: &Path) -> KaiResult<Vec<Skill>> {
    if !fs::try_exists(dir).await.unwrap_or(false) {
        debug!("No skills directory at {}", dir.display());
        return Ok(Vec::new());
    }

    let mut skill_dirs = Vec::new();
    for path in list_dir(dir).await? {
        if fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
            skill_dirs.push(path);
        }
    }

    let mut skills = Vec::new();
    for skill_dir in skill_dirs {
        let skill_file = skill_dir.join(SKILL_FILE);
        if !fs::try_exists(&skill_file).await.unwrap_or(false) {
            debug!("Skipping {}: no {}", skill_dir.display(), SKILL_FILE);
            continue;
        }
        let skill = load_skill(&skill_dir).await?;
        debug!(
            "Discovered skill '{}' with {} tier(s) and {} component(s)",
            skill.id,
            skill.tier_count(),
            skill.components.len()
        );
        skills.push(skill);
    }

    Ok(skills)
}

/// Load one skill directory
pub async fn load_skill(skill_dir: &Path) -> KaiResult<Skill> {
    let skill_file = skill_dir.join(SKILL_FILE);
    let location = skill_file.display().to_string();

    let content = fs::read_to_string(&skill_file).await.map_err(|e| {
        KaiError::io_with_path(format!("Failed to read skill file: {}", e), location.clone())
    })?;

    let (yaml, _body) = split_frontmatter(&content);
    let yaml = yaml.ok_or_else(|| {
        KaiError::invalid_declaration_at("Skill file has no frontmatter", location.clone())
    })?;
    let frontmatter: SkillFrontmatter = if yaml.trim().is_empty() {
        SkillFrontmatter::default()
    } else {
        serde_yaml::from_str(yaml).map_err(|e| {
            KaiError::invalid_declaration_at(format!("Malformed frontmatter: {}", e), location.clone())
        })?
    };

    let dir_name = skill_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id = frontmatter
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(dir_name);

    let description = frontmatter
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            KaiError::invalid_declaration_at(
                format!("Skill '{}' has no description", id),
                location.clone(),
            )
        })?;

    let mut skill = Skill::new(&id, description)
        .with_triggers(&frontmatter.triggers)
        .with_source(SkillSource::Directory(skill_dir.to_path_buf()))
        .with_tier(ContentRef::Body(skill_file.clone()));

    let components = list_components(&skill_dir.join(COMPONENTS_DIR)).await?;

    let methodology = skill_dir.join(METHODOLOGY_FILE);
    if fs::try_exists(&methodology).await.unwrap_or(false) {
        skill = skill.with_tier(ContentRef::File(methodology));
    } else if !components.is_empty() {
        skill = skill.with_tier(ContentRef::Inline(String::new()));
    }

    if !components.is_empty() {
        skill = skill.with_tier(ContentRef::Inline(component_index(&id, &components)));
        for (component_id, path) in components {
            skill = skill.with_component(component_id, ContentRef::File(path));
        }
    }

    Ok(skill)
}

/// Tier 3 summary naming every component
fn component_index(skill_id: &str, components: &[(String, PathBuf)]) -> String {
    let mut index = format!("Components of {}:\n", skill_id);
    for (id, _) in components {
        index.push_str("- ");
        index.push_str(id);
        index.push('\n');
    }
    index
}

async fn list_components(dir: &Path) -> KaiResult<Vec<(String, PathBuf)>> {
    if !fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let mut components = Vec::new();
    for path in list_dir(dir).await? {
        if !fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) {
            if !stem.starts_with('.') {
                components.push((stem, path));
            }
        }
    }
    Ok(components)
}

/// Directory entries sorted by file name
async fn list_dir(dir: &Path) -> KaiResult<Vec<PathBuf>> {
    let io_err = |e: std::io::Error| {
        KaiError::io_with_path(
            format!("Failed to read directory: {}", e),
            dir.display().to_string(),
        )
    };

    let mut entries = fs::read_dir(dir).await.map_err(io_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}
