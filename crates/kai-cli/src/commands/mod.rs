//! CLI command handlers

pub mod dispatch;
pub mod inspect;
pub mod run;
