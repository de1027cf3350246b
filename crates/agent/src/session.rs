//! The single conversation held with the model for one run.

use momo_core::error::ProviderError;
use momo_core::message::{Conversation, Message};
use momo_core::provider::{Provider, ProviderRequest, Usage};
use std::sync::Arc;
use tracing::debug;

/// Conversation state plus the provider it is sent to.
///
/// The conversation is seeded once with the system message. Each
/// [`chat`](ChatSession::chat) appends the user text and the reply.
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    conversation: Conversation,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            conversation: Conversation::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Swap the endpoint, e.g. after the API key or base URL changed.
    pub fn set_provider(&mut self, provider: Arc<dyn Provider>) {
        self.provider = provider;
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn set_sampling(&mut self, temperature: f32, max_tokens: Option<u32>) {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_seeded(&self) -> bool {
        self.conversation.is_seeded()
    }

    /// Start a fresh conversation whose first message is `system_prompt`.
    pub fn seed(&mut self, system_prompt: impl Into<String>) {
        let mut conversation = Conversation::new();
        conversation.push(Message::system(system_prompt));
        debug!(conversation_id = %conversation.id, "Session seeded");
        self.conversation = conversation;
    }

    /// Send `text` as the next user message and return the reply text.
    ///
    /// On failure the user message is withdrawn so the conversation stays
    /// alternating.
    pub async fn chat(&mut self, text: &str) -> Result<(String, Option<Usage>), ProviderError> {
        self.conversation.push(Message::user(text));

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: self.conversation.messages.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let text = response.message.content.clone();
                self.conversation.push(Message::assistant(&text));
                debug!(
                    model = %response.model,
                    tokens = response.usage.map(|u| u.total_tokens),
                    "Reply received"
                );
                Ok((text, response.usage))
            }
            Err(e) => {
                self.conversation.messages.pop();
                Err(e)
            }
        }
    }
}
