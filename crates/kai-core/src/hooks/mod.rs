//! Lifecycle hooks
//!
//! Hooks are external executables bound to one lifecycle event kind. For each
//! event the [`Dispatcher`] runs every planned hook concurrently, bounds each by
//! its timeout, and reports one [`ExecutionResult`] per hook in plan order. A
//! failing hook never affects its siblings.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kai_core::event::{Event, EventKind};
//! use kai_core::hooks::{Dispatcher, HookRegistration, Invocation, ProcessInvoker};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let hook = HookRegistration::new(
//!     "greet",
//!     EventKind::SessionStart,
//!     Invocation::new("/bin/echo").with_arg("hello"),
//! );
//! let dispatcher = Dispatcher::new(Arc::new(ProcessInvoker::new()));
//! let results = dispatcher
//!     .dispatch(
//!         &Event::bare(EventKind::SessionStart),
//!         &[hook],
//!         "session-1",
//!         &CancellationToken::new(),
//!     )
//!     .await;
//! for result in results {
//!     println!("{}", result);
//! }
//! # }
//! ```

pub mod dispatcher;
pub mod input;
pub mod invoker;
pub mod registration;
pub mod result;
pub mod settings;

pub use dispatcher::Dispatcher;
pub use input::HookInput;
pub use invoker::{HookInvoker, InvocationOutcome, ProcessInvoker};
pub use registration::{HookRegistration, Invocation};
pub use result::{ExecutionResult, HookError, HookStatus};
pub use settings::{HookDefinition, HookMatcherGroup, HooksSettings};
