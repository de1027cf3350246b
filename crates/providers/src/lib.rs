//! Chat-completion providers for MoMo.
//!
//! All providers implement the `momo_core::Provider` trait. The only
//! network provider speaks the OpenAI-compatible `/chat/completions` API,
//! which covers SiliconFlow, OpenAI, OpenRouter, Ollama, and vLLM.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
