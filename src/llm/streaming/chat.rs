//! Chat-Completions-dialect SSE state machine (spec §4.3, component C3).
//!
//! Data-only records, JSON-per-record, terminated by a literal `[DONE]`
//! sentinel instead of stream closure. Each record is processed independently
//! against the shared [`StreamingContext`]; nothing here buffers across
//! records except the context itself.

use serde_json::Value;

use super::context::StreamingContext;
use super::event::StreamEvent;
use super::mappers::{chat_error_category, chat_finish_reason};
use super::sse::SseRecord;

/// Processes one reassembled Chat-dialect record, mutating `ctx` and emitting
/// zero or more [`StreamEvent`]s via `emit`.
///
/// Malformed records (invalid JSON, or a JSON value that isn't an object) are
/// tolerated and silently skipped (spec §4.3 step 1, §8 robustness
/// properties) rather than treated as a stream error — only an explicit
/// inline `error` object is.
pub fn process_record(record: &SseRecord, ctx: &mut StreamingContext, mut emit: impl FnMut(StreamEvent<'_>)) {
    if record.data == "[DONE]" {
        if ctx.in_tool_call {
            emit(StreamEvent::ToolCallDone {
                index: ctx.tool_call_index as u32,
            });
            ctx.end_tool_call();
        }
        emit(StreamEvent::Done {
            finish_reason: ctx.finish_reason,
            usage: ctx.usage,
        });
        return;
    }

    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(&record.data) else {
        return;
    };

    if let Some(Value::Object(error)) = root.get("error") {
        let category = chat_error_category(error.get("type").and_then(Value::as_str));
        let message = error.get("message").and_then(Value::as_str).unwrap_or("");
        emit(StreamEvent::Error { category, message });
        return;
    }

    if let Some(model) = root.get("model").and_then(Value::as_str) {
        ctx.set_model_if_unset(model);
    }

    if let Some(Value::Array(choices)) = root.get("choices") {
        if let Some(Value::Object(choice)) = choices.first() {
            if let Some(Value::Object(delta)) = choice.get("delta") {
                process_delta(delta, ctx, &mut emit);
            }
            if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                if ctx.in_tool_call {
                    emit(StreamEvent::ToolCallDone {
                        index: ctx.tool_call_index as u32,
                    });
                    ctx.end_tool_call();
                }
                ctx.finish_reason = chat_finish_reason(Some(reason));
            }
        }
    }

    if let Some(Value::Object(usage)) = root.get("usage") {
        let input = usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
        let output = usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0);
        let total = usage.get("total_tokens").and_then(Value::as_u64);
        let thinking = usage
            .get("completion_tokens_details")
            .and_then(Value::as_object)
            .and_then(|d| d.get("reasoning_tokens"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        ctx.usage.input_tokens = input;
        ctx.usage.output_tokens = output;
        ctx.usage.thinking_tokens = thinking;
        ctx.usage = ctx.usage.with_computed_total(total);
    }
}

fn process_delta(
    delta: &serde_json::Map<String, Value>,
    ctx: &mut StreamingContext,
    emit: &mut impl FnMut(StreamEvent<'_>),
) {
    // Supplemented per SPEC_FULL.md §C.1: reasoning-capable Chat-compatible
    // backends stream a parallel `reasoning_content` field using the same
    // first-write/index-0 shape as `content`.
    if let Some(text) = delta.get("reasoning_content").and_then(Value::as_str) {
        if !ctx.started {
            ctx.started = true;
            emit(StreamEvent::Start { model: ctx.model.as_deref() });
        }
        emit(StreamEvent::ThinkingDelta { index: 0, text });
    }

    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        if ctx.in_tool_call {
            emit(StreamEvent::ToolCallDone {
                index: ctx.tool_call_index as u32,
            });
            ctx.end_tool_call();
        }
        if !ctx.started {
            ctx.started = true;
            emit(StreamEvent::Start { model: ctx.model.as_deref() });
        }
        emit(StreamEvent::TextDelta { index: 0, text });
    }

    if let Some(Value::Array(tool_calls)) = delta.get("tool_calls") {
        if let Some(Value::Object(tool_call)) = tool_calls.first() {
            let index = tool_call.get("index").and_then(Value::as_i64).unwrap_or(0);
            let id = tool_call.get("id").and_then(Value::as_str);
            let function = tool_call.get("function").and_then(Value::as_object);
            let name = function.and_then(|f| f.get("name")).and_then(Value::as_str);
            let arguments = function.and_then(|f| f.get("arguments")).and_then(Value::as_str);

            if let (Some(id), Some(name)) = (id, name) {
                if ctx.in_tool_call && ctx.tool_call_index != index {
                    emit(StreamEvent::ToolCallDone {
                        index: ctx.tool_call_index as u32,
                    });
                    ctx.end_tool_call();
                }
                if !ctx.started {
                    ctx.started = true;
                    emit(StreamEvent::Start { model: ctx.model.as_deref() });
                }
                ctx.start_tool_call(index, id, name);
                emit(StreamEvent::ToolCallStart { index: index as u32, id, name });
            }

            if let Some(arguments) = arguments {
                ctx.append_tool_args(arguments);
                emit(StreamEvent::ToolCallDelta {
                    index: index as u32,
                    arguments,
                });
            }
        }
    }
}
