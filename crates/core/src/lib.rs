//! # MoMo Core
//!
//! Domain types, traits, and error definitions for the MoMo chat agent.
//! Every other crate in the workspace depends inward on this one.
//!
//! The seams that the agent loop is tested through live here:
//! - [`Provider`]: the remote chat endpoint
//! - [`CommandRunner`]: the local shell executor
//! - [`Clock`]: wall-clock time used by memory decay

pub mod clock;
pub mod command;
pub mod error;
pub mod message;
pub mod provider;
pub mod reply;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{CommandRequest, CommandRunner};
pub use error::{Error, Result};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use reply::{FILE_PLACEHOLDER, ModelReply, wrap_user_input};
