//! Environment-backed session configuration

use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{KaiError, KaiResult};
use crate::hooks::registration::default_timeout_ms;

pub const ENV_BASE_DIR: &str = "PAI_DIR";
pub const ENV_LOG_DIR: &str = "PAI_LOG_DIR";
pub const ENV_SESSION_ID: &str = "PAI_SESSION_ID";
pub const ENV_ASSISTANT_NAME: &str = "DA";
pub const ENV_HOOK_TIMEOUT_MS: &str = "KAI_HOOK_TIMEOUT_MS";

pub const DEFAULT_ASSISTANT_NAME: &str = "Kai";
/// Base directory name under the user's home
pub const DEFAULT_BASE_DIR_NAME: &str = ".claude";

const SETTINGS_FILE: &str = "settings.json";
const SKILLS_DIR: &str = "skills";

/// Configuration for one assistant session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Root of hook and skill declarations
    pub base_dir: PathBuf,
    /// Where the execution log is written, if anywhere
    pub log_dir: Option<PathBuf>,
    pub session_id: String,
    pub assistant_name: String,
    /// Timeout for hooks that don't declare one
    pub default_hook_timeout_ms: u64,
}

impl SessionConfig {
    /// Create a configuration rooted at `base_dir` with a fresh session id
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            log_dir: None,
            session_id: uuid::Uuid::new_v4().to_string(),
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            default_hook_timeout_ms: default_timeout_ms(),
        }
    }

    /// Load configuration from the process environment
    ///
    /// A `.env` in the working directory is applied first, then one in the
    /// resolved base directory. Variables already set in the environment win.
    pub fn from_env() -> KaiResult<Self> {
        Self::from_env_at(None)
    }

    /// Like [`from_env`](Self::from_env), with `base_dir` taking precedence
    /// over `PAI_DIR`
    pub fn from_env_at(base_dir: Option<&Path>) -> KaiResult<Self> {
        dotenv::dotenv().ok();

        let base_dir = match base_dir {
            Some(dir) => dir.to_path_buf(),
            None => resolve_base_dir(env::var(ENV_BASE_DIR).ok())?,
        };
        let base_env = base_dir.join(".env");
        if base_env.is_file() {
            if let Err(e) = dotenv::from_path(&base_env) {
                tracing::warn!("Ignoring unreadable {}: {}", base_env.display(), e);
            }
        }

        let base = base_dir.to_string_lossy().into_owned();
        Self::from_lookup(|key| {
            if key == ENV_BASE_DIR {
                Some(base.clone())
            } else {
                env::var(key).ok()
            }
        })
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> KaiResult<Self> {
        let base_dir = resolve_base_dir(lookup(ENV_BASE_DIR))?;
        let mut config = Self::new(base_dir);

        if let Some(log_dir) = lookup(ENV_LOG_DIR).filter(|v| !v.trim().is_empty()) {
            config.log_dir = Some(PathBuf::from(shellexpand::tilde(&log_dir).as_ref()));
        }

        if let Some(session_id) = lookup(ENV_SESSION_ID).filter(|v| !v.trim().is_empty()) {
            config.session_id = session_id;
        }

        if let Some(name) = lookup(ENV_ASSISTANT_NAME).filter(|v| !v.trim().is_empty()) {
            config.assistant_name = name;
        }

        if let Some(timeout) = lookup(ENV_HOOK_TIMEOUT_MS) {
            config.default_hook_timeout_ms = timeout.trim().parse().map_err(|_| {
                KaiError::config_with_context(
                    format!("Invalid {} value '{}'", ENV_HOOK_TIMEOUT_MS, timeout),
                    "expected a whole number of milliseconds",
                )
            })?;
        }

        Ok(config)
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    pub fn with_default_hook_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_hook_timeout_ms = timeout_ms;
        self
    }

    /// Path of the hook declaration file
    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }

    /// Directory holding one subdirectory per skill
    pub fn skills_dir(&self) -> PathBuf {
        self.base_dir.join(SKILLS_DIR)
    }

    /// Path of this session's execution log, when logging is enabled
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("kai-{}.jsonl", self.session_id)))
    }

    /// Resolve a variable, preferring session values over the process environment
    pub fn var(&self, name: &str) -> Option<String> {
        match name {
            ENV_BASE_DIR => Some(self.base_dir.to_string_lossy().into_owned()),
            ENV_LOG_DIR => self
                .log_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned()),
            ENV_SESSION_ID => Some(self.session_id.clone()),
            ENV_ASSISTANT_NAME => Some(self.assistant_name.clone()),
            _ => env::var(name).ok(),
        }
    }

    /// Expand `~` and `${VAR}` references in a declaration value
    ///
    /// Unknown variables are left as written.
    pub fn expand<'a>(&self, value: &'a str) -> Cow<'a, str> {
        shellexpand::full_with_context_no_errors(value, home_dir_string, |name| self.var(name))
    }

    /// Environment exported to every hook process
    pub fn hook_env(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        for name in [ENV_BASE_DIR, ENV_LOG_DIR, ENV_SESSION_ID, ENV_ASSISTANT_NAME] {
            if let Some(value) = self.var(name) {
                vars.insert(name.to_string(), value);
            }
        }
        vars
    }
}

fn home_dir_string() -> Option<String> {
    dirs::home_dir().map(|p| p.to_string_lossy().into_owned())
}

fn resolve_base_dir(value: Option<String>) -> KaiResult<PathBuf> {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(dir) => Ok(expand_home(&dir)),
        None => dirs::home_dir()
            .map(|home| home.join(DEFAULT_BASE_DIR_NAME))
            .ok_or_else(|| {
                KaiError::config_with_context(
                    "Cannot determine home directory",
                    format!("set {} to the base directory", ENV_BASE_DIR),
                )
            }),
    }
}

fn expand_home(dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde_with_context(dir, home_dir_string);
    Path::new(expanded.as_ref()).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("PAI_DIR", "/srv/pai"),
            ("PAI_LOG_DIR", "/var/log/kai"),
            ("PAI_SESSION_ID", "abc"),
            ("DA", "Atlas"),
            ("KAI_HOOK_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();

        assert_eq!(config.base_dir, PathBuf::from("/srv/pai"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/kai")));
        assert_eq!(config.session_id, "abc");
        assert_eq!(config.assistant_name, "Atlas");
        assert_eq!(config.default_hook_timeout_ms, 2500);
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = SessionConfig::from_lookup(lookup(&[("PAI_DIR", "/srv/pai")])).unwrap();
        assert_eq!(config.log_dir, None);
        assert_eq!(config.assistant_name, "Kai");
        assert_eq!(config.default_hook_timeout_ms, 60_000);
        assert!(uuid::Uuid::parse_str(&config.session_id).is_ok());
    }

    #[test]
    fn test_invalid_timeout_is_config_error() {
        let err = SessionConfig::from_lookup(lookup(&[
            ("PAI_DIR", "/srv/pai"),
            ("KAI_HOOK_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, KaiError::Config { .. }));
        assert!(err.to_string().contains("KAI_HOOK_TIMEOUT_MS"));
    }

    #[test]
    fn test_paths() {
        let config = SessionConfig::new("/srv/pai")
            .with_session_id("s1")
            .with_log_dir("/tmp/logs");
        assert_eq!(config.settings_path(), PathBuf::from("/srv/pai/settings.json"));
        assert_eq!(config.skills_dir(), PathBuf::from("/srv/pai/skills"));
        assert_eq!(config.log_path(), Some(PathBuf::from("/tmp/logs/kai-s1.jsonl")));
        assert_eq!(SessionConfig::new("/x").log_path(), None);
    }

    #[test]
    fn test_expand_uses_session_values() {
        let config = SessionConfig::new("/srv/pai").with_assistant_name("Atlas");
        assert_eq!(config.expand("${PAI_DIR}/hooks/notify"), "/srv/pai/hooks/notify");
        assert_eq!(config.expand("$DA"), "Atlas");
        assert_eq!(
            config.expand("${KAI_TEST_SURELY_UNSET_VAR}/x"),
            "${KAI_TEST_SURELY_UNSET_VAR}/x"
        );
    }

    #[test]
    fn test_hook_env() {
        let config = SessionConfig::new("/srv/pai").with_session_id("s1");
        let vars = config.hook_env();
        assert_eq!(vars.get("PAI_DIR").map(String::as_str), Some("/srv/pai"));
        assert_eq!(vars.get("PAI_SESSION_ID").map(String::as_str), Some("s1"));
        assert_eq!(vars.get("DA").map(String::as_str), Some("Kai"));
        assert!(!vars.contains_key("PAI_LOG_DIR"));
    }
}
