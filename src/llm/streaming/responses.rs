//! Responses-dialect SSE state machine (spec §4.4, component C4).
//!
//! Unlike the Chat dialect, records carry a named `event:` field and the JSON
//! shape varies per event name; there is no `[DONE]` sentinel; the stream's
//! own closure plus a terminal `response.completed` event carries that role
//! instead (a mid-stream `error` event can also end things early).

use serde_json::Value;

use super::context::StreamingContext;
use super::event::StreamEvent;
use super::mappers::{responses_error_category, responses_finish_reason};
use super::sse::SseRecord;

/// Processes one reassembled Responses-dialect record, mutating `ctx` and
/// emitting zero or more [`StreamEvent`]s via `emit`.
///
/// Unrecognized event names (spec §4.4: ping events, and any event this
/// dialect doesn't need) are ignored; malformed JSON is ignored the same way
/// as in the Chat dialect.
pub fn process_record(record: &SseRecord, ctx: &mut StreamingContext, mut emit: impl FnMut(StreamEvent<'_>)) {
    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(&record.data) else {
        return;
    };

    match record.event.as_deref() {
        Some("response.created") => handle_created(&root, ctx, &mut emit),
        Some("response.output_item.added") => handle_output_item_added(&root, ctx, &mut emit),
        Some("response.output_text.delta") => handle_text_delta(&root, ctx, &mut emit),
        Some("response.reasoning_summary_text.delta") => handle_reasoning_delta(&root, ctx, &mut emit),
        Some("response.function_call_arguments.delta") => handle_tool_args_delta(&root, ctx, &mut emit),
        Some("response.output_item.done") => handle_output_item_done(&root, ctx, &mut emit),
        Some("response.completed") => handle_completed(&root, ctx, &mut emit),
        Some("error") => handle_error(&root, &mut emit),
        // response.function_call_arguments.done is a no-op at this layer
        // (spec §4.4): the arguments are already fully accumulated via
        // deltas, and the terminal transition is driven by
        // response.output_item.done instead. response.content_part.added,
        // response.in_progress, ping, and anything else: no normalized
        // event corresponds, ignored.
        _ => {}
    }
}

fn start_if_needed(ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    if !ctx.started {
        ctx.started = true;
        emit(StreamEvent::Start { model: ctx.model.as_deref() });
    }
}

fn handle_created(root: &serde_json::Map<String, Value>, ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    if let Some(model) = root
        .get("response")
        .and_then(Value::as_object)
        .and_then(|r| r.get("model"))
        .and_then(Value::as_str)
    {
        ctx.set_model_if_unset(model);
    }
    start_if_needed(ctx, emit);
}

fn handle_output_item_added(root: &serde_json::Map<String, Value>, ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    let Some(item) = root.get("item").and_then(Value::as_object) else {
        return;
    };
    // Non-function_call items are ignored here (their text, if any, arrives
    // via the text-delta event). This includes a `reasoning` item: its text
    // comes through `response.reasoning_summary_text.delta`.
    if item.get("type").and_then(Value::as_str) != Some("function_call") {
        return;
    }
    let index = root.get("output_index").and_then(Value::as_i64).unwrap_or(0);
    let id = item.get("call_id").and_then(Value::as_str);
    let name = item.get("name").and_then(Value::as_str);
    let (Some(id), Some(name)) = (id, name) else {
        return;
    };

    if ctx.in_tool_call {
        emit(StreamEvent::ToolCallDone {
            index: ctx.tool_call_index as u32,
        });
        ctx.end_tool_call();
    }
    start_if_needed(ctx, emit);
    ctx.start_tool_call(index, id, name);
    emit(StreamEvent::ToolCallStart { index: index as u32, id, name });
}

fn handle_text_delta(root: &serde_json::Map<String, Value>, ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    let index = root.get("content_index").and_then(Value::as_i64).unwrap_or(0) as u32;
    if let Some(text) = root.get("delta").and_then(Value::as_str) {
        start_if_needed(ctx, emit);
        emit(StreamEvent::TextDelta { index, text });
    }
}

fn handle_reasoning_delta(root: &serde_json::Map<String, Value>, ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    let index = root.get("summary_index").and_then(Value::as_i64).unwrap_or(0) as u32;
    if let Some(text) = root.get("delta").and_then(Value::as_str) {
        start_if_needed(ctx, emit);
        emit(StreamEvent::ThinkingDelta { index, text });
    }
}

fn handle_tool_args_delta(root: &serde_json::Map<String, Value>, ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    if !ctx.in_tool_call {
        return;
    }
    let index = root.get("output_index").and_then(Value::as_i64).unwrap_or(ctx.tool_call_index);
    if let Some(arguments) = root.get("delta").and_then(Value::as_str) {
        ctx.append_tool_args(arguments);
        emit(StreamEvent::ToolCallDelta { index: index as u32, arguments });
    }
}

fn handle_output_item_done(root: &serde_json::Map<String, Value>, ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    let output_index = root.get("output_index").and_then(Value::as_i64).unwrap_or(0);
    if ctx.in_tool_call && output_index == ctx.tool_call_index {
        emit(StreamEvent::ToolCallDone { index: output_index as u32 });
        ctx.end_tool_call();
    }
}

fn handle_completed(root: &serde_json::Map<String, Value>, ctx: &mut StreamingContext, emit: &mut impl FnMut(StreamEvent<'_>)) {
    if ctx.in_tool_call {
        emit(StreamEvent::ToolCallDone {
            index: ctx.tool_call_index as u32,
        });
        ctx.end_tool_call();
    }

    let response = root.get("response").and_then(Value::as_object);
    let status = response.and_then(|r| r.get("status")).and_then(Value::as_str);
    let incomplete_reason = response
        .and_then(|r| r.get("incomplete_details"))
        .and_then(Value::as_object)
        .and_then(|d| d.get("reason"))
        .and_then(Value::as_str);
    ctx.finish_reason = responses_finish_reason(status, incomplete_reason);

    if let Some(usage) = response.and_then(|r| r.get("usage")).and_then(Value::as_object) {
        let input = usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0);
        let output = usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0);
        let total = usage.get("total_tokens").and_then(Value::as_u64);
        let thinking = usage
            .get("output_tokens_details")
            .and_then(Value::as_object)
            .and_then(|d| d.get("reasoning_tokens"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        ctx.usage.input_tokens = input;
        ctx.usage.output_tokens = output;
        ctx.usage.thinking_tokens = thinking;
        ctx.usage = ctx.usage.with_computed_total(total);
    }

    emit(StreamEvent::Done {
        finish_reason: ctx.finish_reason,
        usage: ctx.usage,
    });
}

fn handle_error(root: &serde_json::Map<String, Value>, emit: &mut impl FnMut(StreamEvent<'_>)) {
    let Some(error) = root.get("error").and_then(Value::as_object) else {
        return;
    };
    let category = responses_error_category(error.get("type").and_then(Value::as_str));
    let message = error.get("message").and_then(Value::as_str).unwrap_or("Unknown error");
    emit(StreamEvent::Error { category, message });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::streaming::event::{ErrorCategory, FinishReason, OwnedStreamEvent as E, Usage};
    use crate::llm::streaming::sse::SseReassembler;

    fn run(input: &str) -> (StreamingContext, Vec<E>) {
        let mut ctx = StreamingContext::new();
        let mut reassembler = SseReassembler::new();
        reassembler.push(input.as_bytes());
        let mut events = Vec::new();
        while let Some(record) = reassembler.next_record() {
            process_record(&record, &mut ctx, |e| events.push(e.into()));
        }
        (ctx, events)
    }

    // S3-ish: Responses dialect, plain text to completion.
    #[test]
    fn responses_plain_text_to_completion() {
        let input = concat!(
            "event: response.created\n",
            "data: {\"response\":{\"model\":\"gpt-5\"}}\n\n",
            "event: response.output_text.delta\n",
            "data: {\"content_index\":0,\"delta\":\"Hi\"}\n\n",
            "event: response.completed\n",
            "data: {\"response\":{\"status\":\"completed\",",
            "\"usage\":{\"input_tokens\":5,\"output_tokens\":1,\"total_tokens\":6}}}\n\n",
        );
        let (_ctx, events) = run(input);
        assert_eq!(
            events,
            vec![
                E::Start { model: Some("gpt-5".to_string()) },
                E::TextDelta { index: 0, text: "Hi".to_string() },
                E::Done {
                    finish_reason: FinishReason::Stop,
                    usage: Usage { input_tokens: 5, output_tokens: 1, thinking_tokens: 0, total_tokens: 6 },
                },
            ]
        );
    }

    #[test]
    fn responses_function_call_lifecycle() {
        let input = concat!(
            "event: response.output_item.added\n",
            "data: {\"output_index\":0,\"item\":{\"type\":\"function_call\",\"call_id\":\"call_9\",\"name\":\"search\"}}\n\n",
            "event: response.function_call_arguments.delta\n",
            "data: {\"output_index\":0,\"delta\":\"{\\\"q\\\":\"}\n\n",
            "event: response.function_call_arguments.delta\n",
            "data: {\"output_index\":0,\"delta\":\"\\\"rust\\\"}\"}\n\n",
            "event: response.function_call_arguments.done\n",
            "data: {\"output_index\":0}\n\n",
            "event: response.output_item.done\n",
            "data: {\"output_index\":0}\n\n",
            "event: response.completed\n",
            "data: {\"response\":{\"status\":\"completed\"}}\n\n",
        );
        let (ctx, events) = run(input);
        assert_eq!(events[0], E::Start { model: None });
        assert_eq!(
            events[1],
            E::ToolCallStart { index: 0, id: "call_9".to_string(), name: "search".to_string() }
        );
        assert!(matches!(events[2], E::ToolCallDelta { index: 0, .. }));
        assert!(matches!(events[3], E::ToolCallDelta { index: 0, .. }));
        assert_eq!(events[4], E::ToolCallDone { index: 0 });
        assert_eq!(ctx.current_tool_args.as_deref(), Some("{\"q\":\"rust\"}"));
    }

    #[test]
    fn reasoning_output_item_is_a_no_op() {
        let input = concat!(
            "event: response.output_item.added\n",
            "data: {\"output_index\":0,\"item\":{\"type\":\"reasoning\"}}\n\n",
            "event: response.reasoning_summary_text.delta\n",
            "data: {\"summary_index\":0,\"delta\":\"pondering\"}\n\n",
        );
        let (_ctx, events) = run(input);
        assert_eq!(
            events,
            vec![E::Start { model: None }, E::ThinkingDelta { index: 0, text: "pondering".to_string() }]
        );
    }

    // S5: inline error mid-stream, no preceding response.created.
    #[test]
    fn bare_error_event_emits_error_with_mapped_category() {
        let input = "event: error\ndata: {\"error\":{\"type\":\"rate_limit_error\",\"message\":\"slow down\"}}\n\n";
        let (ctx, events) = run(input);
        assert_eq!(
            events,
            vec![E::Error { category: ErrorCategory::RateLimit, message: "slow down".to_string() }]
        );
        // An inline error does not itself touch finish_reason or emit START/DONE.
        assert_eq!(ctx.finish_reason, FinishReason::Unknown);
    }

    // response.failed is not part of the named-event vocabulary this dialect
    // recognizes (spec §4.4); it falls into "any other event name: ignore".
    #[test]
    fn response_failed_event_name_is_ignored() {
        let input = concat!(
            "event: response.failed\n",
            "data: {\"response\":{\"error\":{\"type\":\"rate_limit_error\",\"message\":\"too fast\"}}}\n\n",
        );
        let (_ctx, events) = run(input);
        assert!(events.is_empty());
    }

    #[test]
    fn incomplete_with_content_filter_reason_maps_correctly() {
        let input = concat!(
            "event: response.completed\n",
            "data: {\"response\":{\"status\":\"incomplete\",",
            "\"incomplete_details\":{\"reason\":\"content_filter\"}}}\n\n",
        );
        let (ctx, _events) = run(input);
        assert_eq!(ctx.finish_reason, FinishReason::ContentFilter);
    }

    #[test]
    fn unrecognized_event_names_are_ignored() {
        let (_ctx, events) = run("event: response.in_progress\ndata: {}\n\n");
        assert!(events.is_empty());
    }
}
