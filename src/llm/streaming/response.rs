//! Terminal response builder (spec §4.5, component C6).

use super::context::StreamingContext;
use super::event::{FinishReason, Usage};

/// A provider-agnostic terminal snapshot of a completed (or abandoned)
/// stream (spec §3.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub model: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub content_blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text { text: String },
    ToolCall { id: String, name: String, arguments: String },
}

/// Builds a [`Response`] from a stream's accumulated context.
///
/// Safe to call at any point in a stream's lifetime, including mid-error:
/// it only reads what has been accumulated so far. Text deltas are never
/// reconstructed here — they were already delivered live to the stream
/// callback (spec §4.5 rationale).
pub fn build_response(ctx: &StreamingContext) -> Response {
    let mut content_blocks = Vec::new();
    let mut finish_reason = ctx.finish_reason;

    if let (Some(id), Some(name)) = (&ctx.current_tool_id, &ctx.current_tool_name) {
        let arguments = ctx.current_tool_args.clone().unwrap_or_else(|| "{}".to_string());
        content_blocks.push(ContentBlock::ToolCall {
            id: id.clone(),
            name: name.clone(),
            arguments,
        });
        finish_reason = FinishReason::ToolUse;
    }

    Response {
        model: ctx.model.clone(),
        finish_reason,
        usage: ctx.usage,
        content_blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tool_call_yields_no_content_blocks() {
        let mut ctx = StreamingContext::new();
        ctx.model = Some("gpt-4o".to_string());
        ctx.finish_reason = FinishReason::Stop;

        let response = build_response(&ctx);
        assert_eq!(response.model.as_deref(), Some("gpt-4o"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert!(response.content_blocks.is_empty());
    }

    #[test]
    fn tool_call_overrides_finish_reason_to_tool_use() {
        let mut ctx = StreamingContext::new();
        ctx.finish_reason = FinishReason::Stop; // e.g. wire said "stop" before tool_calls was seen
        ctx.start_tool_call(0, "call_w", "get_weather");
        ctx.append_tool_args("{\"city\":\"Paris\"}");
        ctx.end_tool_call();

        let response = build_response(&ctx);
        assert_eq!(response.finish_reason, FinishReason::ToolUse);
        assert_eq!(
            response.content_blocks,
            vec![ContentBlock::ToolCall {
                id: "call_w".to_string(),
                name: "get_weather".to_string(),
                arguments: "{\"city\":\"Paris\"}".to_string(),
            }]
        );
    }

    #[test]
    fn missing_arguments_defaults_to_empty_object() {
        let mut ctx = StreamingContext::new();
        ctx.start_tool_call(0, "call_x", "noop");
        ctx.current_tool_args = None;

        let response = build_response(&ctx);
        assert_eq!(
            response.content_blocks,
            vec![ContentBlock::ToolCall {
                id: "call_x".to_string(),
                name: "noop".to_string(),
                arguments: "{}".to_string(),
            }]
        );
    }
}
