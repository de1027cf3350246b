//! The agent loop for MoMo.
//!
//! One user turn runs **Reply → Remember → Run → Repeat**:
//!
//! 1. **Send** the user's text (stamped with the time) to the model
//! 2. **Parse** the JSON reply and show its message
//! 3. **Remember** new facts and reinforce the ones the model used
//! 4. **Run** the requested shell command, if any, and send its output back
//! 5. **Repeat** from step 2 until a reply asks for no command
//!
//! The number of commands per turn is capped; exceeding it aborts the turn.

pub mod environment;
pub mod loop_runner;
pub mod prompt;
pub mod session;
pub mod turn_event;

pub use environment::EnvironmentInfo;
pub use loop_runner::{AgentLoop, LoopLimits, TurnFailure, TurnOutcome};
pub use prompt::{DEFAULT_RULES, PromptParts};
pub use session::ChatSession;
pub use turn_event::{TurnEvent, TurnObserver};
