//! Local command execution for MoMo.
//!
//! The model may ask for one shell command per reply. [`ShellExecutor`]
//! runs it with a hard time limit and turns every outcome, including
//! failures, into text that is sent back to the model.

pub mod shell;

pub use shell::ShellExecutor;
