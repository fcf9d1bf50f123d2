//! Session configuration
//!
//! Configuration is read once at session start from the process environment
//! (optionally seeded by `.env` files) and is immutable afterwards.

mod session_config;

pub use session_config::{
    DEFAULT_ASSISTANT_NAME, DEFAULT_BASE_DIR_NAME, ENV_ASSISTANT_NAME, ENV_BASE_DIR,
    ENV_HOOK_TIMEOUT_MS, ENV_LOG_DIR, ENV_SESSION_ID, SessionConfig,
};
