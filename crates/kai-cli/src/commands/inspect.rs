//! Inspection commands: match, hooks, skills

use anyhow::{Context, Result};
use colored::*;
use kai_core::{EventKind, Matcher, Registry, SessionConfig, SkillTrigger, load_registry};
use std::sync::Arc;

use crate::console::CliConsole;

async fn registry(config: &SessionConfig) -> Result<Registry> {
    load_registry(config)
        .await
        .context("Failed to load hook and skill declarations")
}

/// Print the ids of skills an utterance would activate, one per line
pub async fn match_utterance(config: &SessionConfig, utterance: &str) -> Result<()> {
    let matcher = Matcher::new(Arc::new(registry(config).await?));
    for skill_id in matcher.match_utterance(utterance) {
        println!("{}", skill_id);
    }
    Ok(())
}

/// List registered hooks per event kind in dispatch order
pub async fn list_hooks(config: &SessionConfig, console: &CliConsole) -> Result<()> {
    let registry = registry(config).await?;
    if registry.hook_count() == 0 {
        console.warn(&format!(
            "No hooks declared in {}",
            config.settings_path().display()
        ));
        return Ok(());
    }

    for kind in EventKind::all() {
        let hooks = registry.hooks_for(*kind);
        if hooks.is_empty() {
            continue;
        }
        console.print_header(&format!("{} ({})", kind, kind.description()));
        for (position, hook) in hooks.iter().enumerate() {
            let mut command = hook.invocation.program.display().to_string();
            for arg in &hook.invocation.args {
                command.push(' ');
                command.push_str(arg);
            }
            let id = if hook.enabled {
                hook.id.cyan().bold()
            } else {
                hook.id.dimmed().strikethrough()
            };
            println!(
                "{:>3}. {:<24} {} {}",
                position + 1,
                id,
                command,
                format!("({}ms)", hook.timeout_ms).dimmed()
            );
        }
    }

    console.success(&format!("{} hook(s) registered", registry.hook_count()));
    Ok(())
}

/// List skills with descriptor, triggers and tier count
pub async fn list_skills(config: &SessionConfig, console: &CliConsole) -> Result<()> {
    let registry = registry(config).await?;
    if registry.skill_count() == 0 {
        console.warn(&format!("No skills found in {}", config.skills_dir().display()));
        return Ok(());
    }

    console.print_header("Available Skills");
    for skill in registry.skills() {
        println!(
            "{} {}",
            skill.id.green().bold(),
            format!("[{} tier(s), {} component(s)]", skill.tier_count(), skill.components.len())
                .dimmed()
        );
        println!("    {}", skill.descriptor);

        let mut triggers: Vec<String> = skill.triggers.iter().map(ToString::to_string).collect();
        let declared: Vec<String> = skill
            .triggers
            .iter()
            .filter_map(|t| match t {
                SkillTrigger::Phrase(text) => Some(text.trim().to_lowercase()),
                SkillTrigger::Pattern(_) => None,
            })
            .collect();
        for phrase in registry.trigger_phrases(&skill.id).unwrap_or_default() {
            if !declared.contains(phrase) {
                triggers.push(format!("\"{}\" (descriptor)", phrase));
            }
        }
        if !triggers.is_empty() {
            println!("    {} {}", "triggers:".yellow(), triggers.join(", "));
        }
    }

    println!();
    console.success(&format!("{} skill(s) available", registry.skill_count()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_commands_tolerate_empty_base_dir() {
        let dir = TempDir::new().unwrap();
        let config = SessionConfig::new(dir.path());
        let console = CliConsole::new(false);

        match_utterance(&config, "anything").await.unwrap();
        list_hooks(&config, &console).await.unwrap();
        list_skills(&config, &console).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_settings_fail_startup() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ nope").unwrap();
        let config = SessionConfig::new(dir.path());

        let err = list_hooks(&config, &CliConsole::new(false)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load"));
    }
}
