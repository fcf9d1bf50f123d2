//! Session state and the event-handling engine

pub mod context;
pub mod engine;
pub mod log;

pub use context::{ActivationRecord, SessionContext, SessionSnapshot};
pub use engine::{EventOutcome, Session, SkillActivationOutcome};
pub use log::{ExecutionLog, LogEntry};
