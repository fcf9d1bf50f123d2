//! Kai Core Library
//!
//! Lifecycle hook dispatch and progressive skill disclosure for assistant
//! runtimes. A [`Session`] receives lifecycle [`Event`]s, runs the hooks bound
//! to each event kind, and activates the skills whose triggers occur in user
//! prompts, loading their content one tier at a time.

pub mod config;
pub mod error;
pub mod event;
pub mod hooks;
pub mod matcher;
pub mod registry;
pub mod session;
pub mod skills;

// Re-export commonly used types
pub use config::SessionConfig;
pub use error::{KaiError, KaiResult};
pub use event::{Event, EventKind};
pub use hooks::{
    Dispatcher, ExecutionResult, HookError, HookInput, HookInvoker, HookRegistration, HookStatus,
    Invocation, InvocationOutcome, ProcessInvoker,
};
pub use matcher::{Matcher, Plan, TriggerSet};
pub use registry::{Registry, RegistryBuilder, load_registry};
pub use session::{
    ActivationRecord, EventOutcome, ExecutionLog, Session, SessionContext, SessionSnapshot,
    SkillActivationOutcome,
};
pub use skills::{
    ComponentLoad, ContentRef, ContentSource, Disclosure, DisclosureLoader, DisclosureState,
    FsContentSource, Skill, SkillTrigger, Tier,
};
