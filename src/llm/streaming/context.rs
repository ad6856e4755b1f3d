//! Per-stream accumulated context (spec §3.5, component C5).
//!
//! One instance lives for the lifetime of a single open stream. It is
//! dialect-agnostic: both the Chat and Responses state machines (and, for
//! the sibling provider families, their own adapters) mutate the same shape.

use super::event::{FinishReason, Usage};

#[derive(Debug, Default)]
pub struct StreamingContext {
    pub model: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub started: bool,
    pub in_tool_call: bool,
    /// `-1` means "no active tool call", matching the source's sentinel.
    pub tool_call_index: i64,
    pub current_tool_id: Option<String>,
    pub current_tool_name: Option<String>,
    /// Accumulates across deltas. Retained past `TOOL_CALL_DONE` — the
    /// response builder (C6) needs the final value.
    pub current_tool_args: Option<String>,
}

impl StreamingContext {
    pub fn new() -> Self {
        Self {
            tool_call_index: -1,
            ..Default::default()
        }
    }

    /// First-write-wins model assignment (spec §3.5).
    pub fn set_model_if_unset(&mut self, model: &str) {
        if self.model.is_none() {
            self.model = Some(model.to_string());
        }
    }

    /// Begins tracking a new tool call, overwriting any previous identity.
    /// Callers are responsible for having already closed out a prior tool
    /// call (emitted `TOOL_CALL_DONE`) before calling this.
    pub fn start_tool_call(&mut self, index: i64, id: &str, name: &str) {
        self.tool_call_index = index;
        self.current_tool_id = Some(id.to_string());
        self.current_tool_name = Some(name.to_string());
        self.current_tool_args = Some(String::new());
        self.in_tool_call = true;
    }

    /// Appends an argument fragment to the active tool call.
    pub fn append_tool_args(&mut self, fragment: &str) {
        self.current_tool_args
            .get_or_insert_with(String::new)
            .push_str(fragment);
    }

    /// Marks the active tool call as finished. Deliberately does not clear
    /// `current_tool_id`/`current_tool_name`/`current_tool_args` — the
    /// response builder needs them (spec §3.5 invariants).
    pub fn end_tool_call(&mut self) {
        self.in_tool_call = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_no_active_tool_call() {
        let ctx = StreamingContext::new();
        assert_eq!(ctx.tool_call_index, -1);
        assert!(!ctx.in_tool_call);
        assert_eq!(ctx.finish_reason, FinishReason::Unknown);
    }

    #[test]
    fn model_is_first_write_wins() {
        let mut ctx = StreamingContext::new();
        ctx.set_model_if_unset("gpt-4o");
        ctx.set_model_if_unset("gpt-5");
        assert_eq!(ctx.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn tool_call_lifecycle_retains_fields_after_done() {
        let mut ctx = StreamingContext::new();
        ctx.start_tool_call(0, "call_1", "lookup");
        ctx.append_tool_args("{\"q\":");
        ctx.append_tool_args("\"x\"}");
        ctx.end_tool_call();

        assert!(!ctx.in_tool_call);
        assert_eq!(ctx.current_tool_id.as_deref(), Some("call_1"));
        assert_eq!(ctx.current_tool_name.as_deref(), Some("lookup"));
        assert_eq!(ctx.current_tool_args.as_deref(), Some("{\"q\":\"x\"}"));
    }
}
