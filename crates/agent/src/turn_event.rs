//! Events emitted while a turn is processed.
//!
//! The interactive surface renders these as they arrive, so the user sees
//! each reply before the command it asks for is run.

use serde::{Deserialize, Serialize};

/// What happened during a turn, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A parsed reply; shown even when it also asks for a command.
    Reply {
        message: String,
        total_tokens: Option<u32>,
    },

    /// The reply changed the memory store.
    MemoryUpdated { added: bool, reinforced: usize },

    /// A command is about to run.
    CommandStarted { dir: String, command: String },

    /// A command finished; `output` is what the model will see.
    CommandFinished { output: String },
}

impl TurnEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "reply",
            Self::MemoryUpdated { .. } => "memory_updated",
            Self::CommandStarted { .. } => "command_started",
            Self::CommandFinished { .. } => "command_finished",
        }
    }
}

/// Receives [`TurnEvent`]s. Implemented for any `FnMut(&TurnEvent)`.
pub trait TurnObserver {
    fn on_event(&mut self, event: &TurnEvent);
}

impl<F: FnMut(&TurnEvent)> TurnObserver for F {
    fn on_event(&mut self, event: &TurnEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = TurnEvent::CommandStarted {
            dir: "/tmp".into(),
            command: "ls".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"command_started""#));
        assert!(json.contains(r#""command":"ls""#));
        assert_eq!(event.event_type(), "command_started");
    }

    #[test]
    fn closures_observe() {
        let mut seen = Vec::new();
        let mut observer = |e: &TurnEvent| seen.push(e.event_type());
        observer.on_event(&TurnEvent::CommandFinished { output: "x".into() });
        assert_eq!(seen, vec!["command_finished"]);
    }
}
