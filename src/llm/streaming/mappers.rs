//! Closed-vocabulary wire-string mappers (spec §4.2).
//!
//! Pure functions, no JSON access here — callers extract the relevant string
//! fields first so each dialect's per-event handler reads as a flat decision
//! list instead of a pyramid of null checks (spec §9).

use super::event::{ErrorCategory, FinishReason};

/// Chat-dialect `finish_reason` string -> [`FinishReason`] (spec §4.2.1).
pub fn chat_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolUse,
        Some("content_filter") => FinishReason::ContentFilter,
        Some("error") => FinishReason::Error,
        _ => FinishReason::Unknown,
    }
}

/// Responses-dialect `status` (+ optional `incomplete_details.reason`) ->
/// [`FinishReason`] (spec §4.2.2).
pub fn responses_finish_reason(status: Option<&str>, incomplete_reason: Option<&str>) -> FinishReason {
    match status {
        Some("completed") => FinishReason::Stop,
        Some("failed") => FinishReason::Error,
        Some("cancelled") => FinishReason::Stop,
        Some("incomplete") => match incomplete_reason {
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Length,
        },
        _ => FinishReason::Unknown,
    }
}

/// Chat-dialect inline `error.type` -> [`ErrorCategory`] (spec §4.2.3).
///
/// Substring matching, not exact equality: the Chat family's error shape is
/// not contractually stable across OpenAI-compatible backends.
pub fn chat_error_category(error_type: Option<&str>) -> ErrorCategory {
    let Some(t) = error_type else {
        return ErrorCategory::Unknown;
    };
    if t.contains("authentication") || t.contains("permission") {
        ErrorCategory::Auth
    } else if t.contains("rate_limit") {
        ErrorCategory::RateLimit
    } else if t.contains("invalid_request") {
        ErrorCategory::InvalidArg
    } else if t.contains("server") || t.contains("service") {
        ErrorCategory::Server
    } else {
        ErrorCategory::Unknown
    }
}

/// Responses-dialect `error.type` -> [`ErrorCategory`] (spec §4.2.3).
///
/// Exact equality: the Responses error shape is stable.
pub fn responses_error_category(error_type: Option<&str>) -> ErrorCategory {
    match error_type {
        Some("authentication_error") => ErrorCategory::Auth,
        Some("rate_limit_error") => ErrorCategory::RateLimit,
        Some("invalid_request_error") => ErrorCategory::InvalidArg,
        Some("server_error") => ErrorCategory::Server,
        _ => ErrorCategory::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_finish_reasons() {
        assert_eq!(chat_finish_reason(Some("stop")), FinishReason::Stop);
        assert_eq!(chat_finish_reason(Some("length")), FinishReason::Length);
        assert_eq!(chat_finish_reason(Some("tool_calls")), FinishReason::ToolUse);
        assert_eq!(chat_finish_reason(Some("content_filter")), FinishReason::ContentFilter);
        assert_eq!(chat_finish_reason(Some("error")), FinishReason::Error);
        assert_eq!(chat_finish_reason(Some("bogus")), FinishReason::Unknown);
        assert_eq!(chat_finish_reason(None), FinishReason::Unknown);
    }

    #[test]
    fn responses_finish_reasons() {
        assert_eq!(responses_finish_reason(Some("completed"), None), FinishReason::Stop);
        assert_eq!(responses_finish_reason(Some("failed"), None), FinishReason::Error);
        assert_eq!(responses_finish_reason(Some("cancelled"), None), FinishReason::Stop);
        assert_eq!(
            responses_finish_reason(Some("incomplete"), Some("content_filter")),
            FinishReason::ContentFilter
        );
        assert_eq!(responses_finish_reason(Some("incomplete"), None), FinishReason::Length);
        assert_eq!(responses_finish_reason(Some("incomplete"), Some("max_output_tokens")), FinishReason::Length);
        assert_eq!(responses_finish_reason(Some("bogus"), None), FinishReason::Unknown);
    }

    #[test]
    fn chat_error_categories() {
        assert_eq!(chat_error_category(Some("authentication_error")), ErrorCategory::Auth);
        assert_eq!(chat_error_category(Some("permission_denied")), ErrorCategory::Auth);
        assert_eq!(chat_error_category(Some("rate_limit_exceeded")), ErrorCategory::RateLimit);
        assert_eq!(chat_error_category(Some("invalid_request_error")), ErrorCategory::InvalidArg);
        assert_eq!(chat_error_category(Some("server_error")), ErrorCategory::Server);
        assert_eq!(chat_error_category(Some("service_unavailable")), ErrorCategory::Server);
        assert_eq!(chat_error_category(Some("something_else")), ErrorCategory::Unknown);
        assert_eq!(chat_error_category(None), ErrorCategory::Unknown);
    }

    #[test]
    fn responses_error_categories() {
        assert_eq!(responses_error_category(Some("authentication_error")), ErrorCategory::Auth);
        assert_eq!(responses_error_category(Some("rate_limit_error")), ErrorCategory::RateLimit);
        assert_eq!(responses_error_category(Some("invalid_request_error")), ErrorCategory::InvalidArg);
        assert_eq!(responses_error_category(Some("server_error")), ErrorCategory::Server);
        assert_eq!(responses_error_category(Some("authentication")), ErrorCategory::Unknown);
        assert_eq!(responses_error_category(None), ErrorCategory::Unknown);
    }
}
