//! Provider-agnostic streaming core: SSE reassembly, normalized events, the
//! two OpenAI-family dialect state machines, per-stream accumulated context,
//! and the terminal response builder.
//!
//! This module is deliberately free of any HTTP or async concerns — it is
//! exercised directly by [`crate::llm::openai`], and its types
//! ([`event::StreamEvent`], [`context::StreamingContext`],
//! [`response::Response`]) are shared by the sibling `anthropic`/`gemini`
//! providers even though those providers parse their wire format with the
//! `eventsource-stream` crate instead of [`sse::SseReassembler`].

pub mod chat;
pub mod context;
pub mod event;
pub mod mappers;
pub mod responses;
pub mod response;
pub mod sse;

pub use context::StreamingContext;
pub use event::{ErrorCategory, FinishReason, OwnedStreamEvent, StreamEvent, Usage};
pub use response::{build_response, ContentBlock, Response};
pub use sse::{SseReassembler, SseRecord};
