//! System message assembly.

use momo_memory::MemorySnapshot;

use crate::environment::EnvironmentInfo;

/// Reply protocol and command rules given to every character.
pub const DEFAULT_RULES: &str = include_str!("../resources/rules.md");

/// The fixed parts of the system message; memories are added per seeding.
#[derive(Debug, Clone)]
pub struct PromptParts {
    pub persona: String,
    pub rules: String,
    pub environment: EnvironmentInfo,
}

impl PromptParts {
    pub fn new(persona: impl Into<String>, environment: EnvironmentInfo) -> Self {
        Self {
            persona: persona.into(),
            rules: DEFAULT_RULES.to_string(),
            environment,
        }
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = rules.into();
        self
    }

    /// Persona, rules, environment, then the indexed memory listing.
    pub fn render(&self, memories: &MemorySnapshot) -> String {
        let memory_block = if memories.is_empty() {
            "(nothing yet)".to_string()
        } else {
            memories.render()
        };
        format!(
            "{persona}\n\n{rules}\n\n## The user's computer\n{env}\n\n## Your memory\n{memory_block}\n",
            persona = self.persona.trim_end(),
            rules = self.rules.trim_end(),
            env = self.environment.render(),
        )
    }
}
