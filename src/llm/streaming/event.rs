//! Normalized stream event type and the closed vocabularies it carries.
//!
//! This is the provider-agnostic representation every dialect state machine
//! (chat.rs, responses.rs, and the sibling `anthropic`/`gemini` providers)
//! emits to the caller. See spec §3.1-3.4.

/// One normalized event delivered to a stream callback.
///
/// Textual payloads borrow from either the JSON document currently being
/// processed or from owned strings held in the [`super::context::StreamingContext`]
/// for the lifetime of the call that produced them. A callback that needs to
/// retain text past its own invocation must copy it.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent<'a> {
    /// Stream has begun producing content. Emitted at most once per stream.
    Start { model: Option<&'a str> },
    /// A fragment of assistant-visible text for content block `index`.
    TextDelta { index: u32, text: &'a str },
    /// A fragment of reasoning/thinking text for content block `index`.
    ThinkingDelta { index: u32, text: &'a str },
    /// A tool call has begun at `index` with the given `id` and `name`.
    ToolCallStart { index: u32, id: &'a str, name: &'a str },
    /// A fragment of a tool call's JSON arguments for the call at `index`.
    ToolCallDelta { index: u32, arguments: &'a str },
    /// The tool call at `index` has finished; its arguments are complete.
    ToolCallDone { index: u32 },
    /// The stream has reached a terminal state.
    Done { finish_reason: FinishReason, usage: Usage },
    /// A wire-level error arrived inline, mid-stream.
    Error { category: ErrorCategory, message: &'a str },
}

/// Owned copy of [`StreamEvent`], for callers that need to cross an `await`
/// point or otherwise outlive the JSON document a borrowed event was read
/// from (e.g. the `chat()` convenience API, which re-exposes the core as an
/// `async` [`futures::Stream`]).
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedStreamEvent {
    Start { model: Option<String> },
    TextDelta { index: u32, text: String },
    ThinkingDelta { index: u32, text: String },
    ToolCallStart { index: u32, id: String, name: String },
    ToolCallDelta { index: u32, arguments: String },
    ToolCallDone { index: u32 },
    Done { finish_reason: FinishReason, usage: Usage },
    Error { category: ErrorCategory, message: String },
}

impl From<StreamEvent<'_>> for OwnedStreamEvent {
    fn from(event: StreamEvent<'_>) -> Self {
        match event {
            StreamEvent::Start { model } => OwnedStreamEvent::Start {
                model: model.map(str::to_string),
            },
            StreamEvent::TextDelta { index, text } => OwnedStreamEvent::TextDelta {
                index,
                text: text.to_string(),
            },
            StreamEvent::ThinkingDelta { index, text } => OwnedStreamEvent::ThinkingDelta {
                index,
                text: text.to_string(),
            },
            StreamEvent::ToolCallStart { index, id, name } => OwnedStreamEvent::ToolCallStart {
                index,
                id: id.to_string(),
                name: name.to_string(),
            },
            StreamEvent::ToolCallDelta { index, arguments } => OwnedStreamEvent::ToolCallDelta {
                index,
                arguments: arguments.to_string(),
            },
            StreamEvent::ToolCallDone { index } => OwnedStreamEvent::ToolCallDone { index },
            StreamEvent::Done { finish_reason, usage } => OwnedStreamEvent::Done { finish_reason, usage },
            StreamEvent::Error { category, message } => OwnedStreamEvent::Error {
                category,
                message: message.to_string(),
            },
        }
    }
}

/// Closed-vocabulary reason generation stopped. Default is [`FinishReason::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishReason {
    #[default]
    Unknown,
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// Closed-vocabulary error category. Default is [`ErrorCategory::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCategory {
    #[default]
    Unknown,
    Auth,
    RateLimit,
    InvalidArg,
    NotFound,
    Server,
    Network,
    ContentFilter,
}

/// Token usage, all fields non-negative and defaulting to zero (spec §3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub thinking_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    /// Applies the "compute total from input+output" rule from spec §3.4 /
    /// §4.3 step 7 / §4.4 `response.completed`: if `total` is absent and at
    /// least one of `input`/`output` is positive, fill it in.
    pub fn with_computed_total(mut self, wire_total: Option<u64>) -> Self {
        self.total_tokens = match wire_total {
            Some(total) => total,
            None if self.input_tokens > 0 || self.output_tokens > 0 => {
                self.input_tokens + self.output_tokens
            }
            None => 0,
        };
        self
    }
}
