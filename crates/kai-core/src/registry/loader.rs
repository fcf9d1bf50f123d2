//! Registry assembly from on-disk declarations

use tracing::info;

use super::{Registry, RegistryBuilder};
use crate::config::SessionConfig;
use crate::error::KaiResult;
use crate::hooks::HooksSettings;
use crate::skills::discovery;

/// Build the session registry from `settings.json` and the skills directory
///
/// Any malformed declaration aborts loading.
pub async fn load_registry(config: &SessionConfig) -> KaiResult<Registry> {
    let mut builder = RegistryBuilder::new();

    let settings = HooksSettings::load(&config.settings_path()).await?;
    for hook in settings.into_registrations(config)? {
        builder.register_hook(hook)?;
    }

    for skill in discovery::discover(&config.skills_dir()).await? {
        builder.register_skill(skill)?;
    }

    let registry = builder.build();
    info!(
        "Loaded {} hook(s) and {} skill(s) from {}",
        registry.hook_count(),
        registry.skill_count(),
        config.base_dir.display()
    );
    Ok(registry)
}
