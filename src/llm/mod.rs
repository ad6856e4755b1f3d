// LLM Provider Module
// Provides a unified interface for multiple LLM providers, each normalizing
// onto the shared streaming event vocabulary in `streaming`.

pub mod provider;
pub mod streaming;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "gemini")]
pub mod gemini;


// Re-export main types
pub use provider::*;
pub use streaming::{ErrorCategory, FinishReason, OwnedStreamEvent, StreamEvent, StreamingContext, Usage};

#[cfg(feature = "openai")]
pub use openai::OpenAIProvider;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicProvider;

#[cfg(feature = "gemini")]
pub use gemini::GeminiProvider;
