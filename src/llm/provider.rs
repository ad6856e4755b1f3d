use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

use super::streaming::OwnedStreamEvent;

// ============================================================================
// Core Trait
// ============================================================================

/// Unified interface for LLM providers (OpenAI, Anthropic, Gemini).
///
/// Every provider family normalizes its wire format onto the same
/// [`OwnedStreamEvent`] vocabulary; the OpenAI family does so via
/// [`crate::llm::streaming`], the others via their own dialect parsing.
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    /// Create a new provider instance with model and API key
    fn create(model: String, api_key: String) -> Result<Self, ProviderError>
    where
        Self: Sized;

    /// Get current provider state (token usage, request count, etc.)
    /// Thread-safe: can be called while streaming is active
    fn state(&self) -> ProviderState;

    /// Get a copy of the current configuration
    fn config(&self) -> ProviderConfig;

    /// Update configuration using a closure
    fn update_config(&self, f: impl FnOnce(&mut ProviderConfig));

    /// Open a streaming chat completion for a single prompt.
    ///
    /// Returns a stream of normalized events; the terminal `Done` event
    /// carries the finish reason and usage (see [`crate::llm::streaming::build_response`]
    /// for reconstructing a full [`crate::llm::streaming::Response`] from an
    /// accumulated context instead of only the live event stream).
    async fn chat(
        &self,
        prompt: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<OwnedStreamEvent, ProviderError>> + Send>>, ProviderError>;

    /// Enable prompt caching for expensive prompts
    fn prompt_cache(&mut self, cache_prompt: String) -> Result<(), ProviderError>;

    /// Compact conversation history to reduce token usage
    ///
    /// For long-running conversations, this compresses the history while preserving
    /// the model's understanding of the conversation context.
    ///
    /// Different providers implement this differently:
    /// - OpenAI: Uses the `/responses/compact` endpoint (Responses API)
    /// - Anthropic: May use context editing or summarization
    /// - Others: May use LLM-based summarization or simple truncation
    ///
    /// Returns the compacted history that can be used in subsequent chat calls
    async fn compact(&self, history: Vec<Message>) -> Result<Vec<Message>, ProviderError>;

    /// Get the current conversation history
    fn get_history(&self) -> Vec<Message>;
}

// ============================================================================
// State and Configuration
// ============================================================================

/// Provider state tracking usage statistics
#[derive(Debug, Clone, Default)]
pub struct ProviderState {
    /// Total input tokens used
    pub input_tokens: u64,

    /// Total output tokens used
    pub output_tokens: u64,

    /// Total cached tokens (for providers supporting prompt caching)
    pub cached_tokens: u64,

    /// Number of API requests made
    pub request_count: u64,

    /// Last request timestamp
    pub last_request_time: Option<std::time::SystemTime>,

    /// Provider-specific metadata
    pub metadata: HashMap<String, String>,

    /// Total conversation loop turns
    pub conversation_turns: u32,
}

/// Configuration options for generation
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Temperature (0.0 - 1.0+)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Top-p sampling
    pub top_p: Option<f32>,

    /// Top-k sampling (for supported providers)
    pub top_k: Option<u32>,

    /// Enable thinking/reasoning mode (for supported providers like Claude)
    pub enable_reasoning: bool,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Stop sequences
    pub stop_sequences: Vec<String>,

    /// Provider-specific options
    pub extra_options: HashMap<String, serde_json::Value>,

    /// Maximum number of tool call/result turns to keep in history (None = unlimited)
    /// One turn = one assistant message with tool calls + corresponding tool result messages
    /// When limit is reached, oldest tool turns are removed
    /// Default: 3 turns
    pub max_tool_turns: Option<usize>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_tokens: 40960, // Increased from 4096 to support longer responses
            top_p: None,
            top_k: None,
            enable_reasoning: false,
            system_prompt: None,
            stop_sequences: Vec::new(),
            extra_options: HashMap::new(),
            max_tool_turns: Some(3), // Keep last 3 tool turns by default
        }
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Message role in conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message in conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    /// Tool call ID (for tool responses)
    pub tool_call_id: Option<String>,

    /// Tool calls made by assistant
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::System => write!(f, "System: {}", self.content),
            Role::User => write!(f, "User: {}", self.content),
            Role::Assistant => write!(f, "Assistant: {}", self.content),
            Role::Tool => write!(f, "Tool: {}", self.content),
        }
    }
}

/// Tool call made by the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============================================================================
// Tool Definition and Results
// ============================================================================

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value, // JSON Schema

    /// Full detailed description (not serialized to LLM)
    ///
    /// When set, `description` is used as the brief description,
    /// and this field contains the full usage details.
    /// Use `get_full_description()` to retrieve the appropriate description.
    #[serde(skip_serializing, default)]
    pub full_description: Option<String>,
}

impl Tool {
    /// Create a new tool with brief and full descriptions
    pub fn new(
        name: impl Into<String>,
        brief: impl Into<String>,
        full_description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: brief.into(),
            parameters,
            full_description: Some(full_description.into()),
        }
    }

    /// Get the full description (falls back to brief if not set)
    pub fn get_full_description(&self) -> &str {
        self.full_description
            .as_deref()
            .unwrap_or(&self.description)
    }

    /// Create a brief version for sending to LLM (strips full_description)
    pub fn as_brief(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            full_description: None,
        }
    }
}

/// Tool execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Must match the tool_call_id from ToolCall
    pub tool_call_id: String,

    /// Result content (can be string, JSON, or error message)
    pub content: String,

    /// Whether the tool execution was successful
    pub is_error: bool,
}

// ============================================================================
// Error Types
// ============================================================================

/// Provider error types
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Prompt caching not supported")]
    CachingNotSupported,

    #[error("Tool calling not supported")]
    ToolCallingNotSupported,

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Maps an HTTP status code to the closed error-category vocabulary, for use
/// when a stream ends (or never begins) with a non-200 response and no
/// inline wire-level error object was available to categorize it instead.
///
/// Grounded on the original `ikigai` implementation's
/// `src/providers/openai/error.h` status table (see SPEC_FULL.md §C.2);
/// the distilled spec leaves this mapping unspecified for the streaming path.
pub fn error_category_from_status(status: u16) -> super::streaming::ErrorCategory {
    use super::streaming::ErrorCategory;
    match status {
        401 | 403 => ErrorCategory::Auth,
        429 => ErrorCategory::RateLimit,
        400 => ErrorCategory::InvalidArg,
        404 => ErrorCategory::NotFound,
        500..=599 => ErrorCategory::Server,
        _ => ErrorCategory::Unknown,
    }
}
