//! The agent loop: one user turn, possibly many model calls.
//!
//! ```text
//! user text ─▶ model ─▶ reply ─▶ memory ─▶ cmd? ──no──▶ done
//!                ▲                          │yes
//!                └──── command output ◀─────┘
//! ```

use momo_config::AppConfig;
use momo_core::clock::Clock;
use momo_core::command::{CommandRequest, CommandRunner};
use momo_core::error::{Error, MemoryError};
use momo_core::provider::Provider;
use momo_core::reply::{ModelReply, wrap_user_input};
use momo_memory::{DecayCurve, MemorySnapshot, MemoryStore};
use momo_tools::ShellExecutor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::prompt::PromptParts;
use crate::session::ChatSession;
use crate::turn_event::{TurnEvent, TurnObserver};

/// Per-turn limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopLimits {
    /// Commands allowed in one turn; asking for one more fails the turn
    pub max_tool_iterations: u32,
    pub command_timeout: Duration,
    /// Memories shown to the model
    pub memory_top_k: usize,
    pub reinforce_boost: f64,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_tool_iterations: 25,
            command_timeout: Duration::from_secs(10),
            memory_top_k: momo_memory::DEFAULT_TOP_K,
            reinforce_boost: momo_memory::DEFAULT_REINFORCE_BOOST,
        }
    }
}

impl LoopLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_tool_iterations: config.agent.max_tool_iterations,
            command_timeout: Duration::from_secs(config.agent.command_timeout_secs),
            memory_top_k: config.agent.memory_top_k,
            reinforce_boost: config.agent.reinforce_boost,
        }
    }
}

/// A turn that ended with a reply asking for no command.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// The final reply's message
    pub message: String,
    pub model_calls: u32,
    pub commands_run: u32,
    pub total_tokens: u64,
}

/// An aborted turn. `raw` is the last text exchanged with the model.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct TurnFailure {
    #[source]
    pub error: Error,
    pub raw: Option<String>,
}

impl TurnFailure {
    fn new(error: impl Into<Error>, raw: Option<String>) -> Self {
        Self {
            error: error.into(),
            raw,
        }
    }
}

/// Owns everything one interactive session mutates.
pub struct AgentLoop {
    session: ChatSession,
    memory: MemoryStore,
    /// The memory listing the model was last shown
    snapshot: MemorySnapshot,
    runner: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
    memory_path: Option<PathBuf>,
    limits: LoopLimits,
    prompt: Option<PromptParts>,
}

impl AgentLoop {
    pub fn new(
        session: ChatSession,
        memory: MemoryStore,
        runner: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session,
            memory,
            snapshot: MemorySnapshot::default(),
            runner,
            clock,
            memory_path: None,
            limits: LoopLimits::default(),
            prompt: None,
        }
    }

    /// Wire up a loop from settings: memory loaded from its file, a shell
    /// executor, and the configured limits.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let path = config.memory_path();
        let curve = DecayCurve::with_half_life_days(config.memory.half_life_days);
        let memory = MemoryStore::load(&path, config.memory.capacity, curve, clock.clone());
        let session = ChatSession::new(provider, config.model.clone())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);
        let runner = ShellExecutor::new()
            .with_grace(Duration::from_secs(config.agent.command_grace_secs));

        Self::new(session, memory, Arc::new(runner), clock)
            .with_limits(LoopLimits::from_config(config))
            .with_memory_path(path)
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Persist memory to `path` after every change and on shutdown.
    pub fn with_memory_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.memory_path = Some(path.into());
        self
    }

    pub fn limits(&self) -> &LoopLimits {
        &self.limits
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn memory_path(&self) -> Option<&Path> {
        self.memory_path.as_deref()
    }

    pub fn snapshot(&self) -> &MemorySnapshot {
        &self.snapshot
    }

    /// Build the system message and seed the session with it.
    pub fn bootstrap(&mut self, parts: PromptParts) {
        self.prompt = Some(parts);
        self.reseed();
    }

    /// Seed a fresh conversation from the stored prompt parts and the
    /// current top memories.
    pub fn reseed(&mut self) {
        let Some(parts) = &self.prompt else {
            warn!("Reseed requested before bootstrap");
            return;
        };
        self.snapshot = self.memory.snapshot(self.limits.memory_top_k);
        let system = parts.render(&self.snapshot);
        self.session.seed(system);
        info!(memories = self.snapshot.len(), "Session bootstrapped");
    }

    /// Switch character and start over.
    pub fn set_persona(&mut self, persona: impl Into<String>) {
        if let Some(parts) = &mut self.prompt {
            parts.persona = persona.into();
        }
        self.reseed();
    }

    /// Run one user turn to completion.
    ///
    /// Replies are parsed, memory is updated and persisted, and any requested
    /// command is run with its output sent back, until a reply asks for no
    /// command. Transport and parse failures abort the turn.
    pub async fn process_turn(
        &mut self,
        text: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome, TurnFailure> {
        if !self.session.is_seeded() {
            return Err(TurnFailure::new(
                Error::Internal("session has not been bootstrapped".into()),
                None,
            ));
        }

        let mut input = wrap_user_input(text, self.clock.now());
        let mut model_calls = 0u32;
        let mut commands_run = 0u32;
        let mut total_tokens = 0u64;

        loop {
            let (raw, usage) = match self.session.chat(&input).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "Model call failed");
                    return Err(TurnFailure::new(e, Some(input)));
                }
            };
            model_calls += 1;
            let tokens = usage.map(|u| u.total_tokens);
            total_tokens += u64::from(tokens.unwrap_or(0));

            let reply = match ModelReply::parse(&raw) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "Model reply could not be parsed");
                    return Err(TurnFailure::new(e, Some(raw)));
                }
            };
            debug!(
                has_command = reply.command().is_some(),
                remember = reply.remember().is_some(),
                "Reply parsed"
            );

            observer.on_event(&TurnEvent::Reply {
                message: reply.message.clone(),
                total_tokens: tokens,
            });

            let (added, reinforced) = self.apply_memory(&reply);
            if added || reinforced > 0 {
                self.persist();
                observer.on_event(&TurnEvent::MemoryUpdated { added, reinforced });
            }

            let Some(command) = reply.resolved_command() else {
                return Ok(TurnOutcome {
                    message: reply.message,
                    model_calls,
                    commands_run,
                    total_tokens,
                });
            };

            if commands_run >= self.limits.max_tool_iterations {
                warn!(
                    limit = self.limits.max_tool_iterations,
                    "Tool-loop budget exhausted"
                );
                return Err(TurnFailure::new(
                    Error::ToolLoopBudgetExceeded {
                        limit: self.limits.max_tool_iterations,
                    },
                    Some(raw),
                ));
            }

            let dir = reply.command_dir().to_string();
            observer.on_event(&TurnEvent::CommandStarted {
                dir: dir.clone(),
                command: command.clone(),
            });

            let request = CommandRequest::new(command, self.limits.command_timeout).in_dir(&dir);
            let output = self.runner.run(request).await;
            commands_run += 1;

            observer.on_event(&TurnEvent::CommandFinished {
                output: output.clone(),
            });
            input = output;
        }
    }

    /// Add, then reinforce against the listing the model saw.
    fn apply_memory(&mut self, reply: &ModelReply) -> (bool, usize) {
        let added = match reply.remember() {
            Some(fact) => {
                self.memory.add(fact, 0.0);
                true
            }
            None => false,
        };

        let indices = reply.reinforce_indices();
        let reinforced = if indices.is_empty() {
            0
        } else {
            self.memory
                .reinforce_snapshot(&self.snapshot, &indices, self.limits.reinforce_boost)
        };
        (added, reinforced)
    }

    fn persist(&mut self) {
        let Some(path) = &self.memory_path else {
            return;
        };
        if let Err(e) = self.memory.save(path) {
            warn!(path = %path.display(), error = %e, "Failed to save memories");
        }
    }

    /// Flush memory to disk.
    pub fn shutdown(&mut self) -> Result<(), MemoryError> {
        match &self.memory_path {
            Some(path) => self.memory.save(path),
            None => Ok(()),
        }
    }
}
