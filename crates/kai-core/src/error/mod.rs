//! Error types for Kai
//!
//! Registration-time errors (duplicate ids, bad tier layout, malformed
//! declarations) are fatal to startup. Run-time failures of individual hooks
//! are not errors at this level: they are recorded as
//! [`HookError`](crate::hooks::HookError) values inside execution results.
//! Content load failures surface as [`KaiError::ContentLoad`] but are scoped
//! to one skill and never abort event handling.

mod constructors;
mod types;

pub use types::{KaiError, KaiResult};
