//! Scripted mock provider server.
//!
//! A standalone HTTP server that streams pre-scripted responses in both the
//! Chat Completions and Responses SSE dialects. Used for deterministic,
//! chunk-boundary-controlled testing of the streaming core over a real HTTP
//! body rather than only in-memory.
//!
//! Grounded on the original `ikigai` mock provider's FIFO response queue
//! (`apps/mock-provider/mock_queue.h`): responses are queued via
//! `/_mock/expect` and popped in order by each `/v1/chat/completions` or
//! `/v1/responses` request; when the queue is empty a canned default is
//! served instead of failing the request.

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One scripted tool call to be streamed back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockToolCall {
    pub name: String,
    pub arguments_json: String,
}

/// A single queued response, popped in FIFO order by the next request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MockResponse {
    Text { content: String },
    ToolCalls { calls: Vec<MockToolCall> },
    /// Fail the request outright with the given HTTP status and body.
    Error { status: u16, message: String },
}

#[derive(Default)]
struct MockQueue {
    responses: VecDeque<MockResponse>,
}

struct AppState {
    queue: Mutex<MockQueue>,
}

/// Handle returned by [`spawn`]; keeps the server's background task alive.
pub struct MockServerHandle {
    pub address: SocketAddr,
    task: tokio::task::JoinHandle<()>,
}

impl MockServerHandle {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }
}

impl Drop for MockServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts the mock server on an OS-assigned local port and returns a handle.
pub async fn spawn() -> std::io::Result<MockServerHandle> {
    spawn_on(0).await
}

/// Starts the mock server bound to the given port (0 for an OS-assigned one).
pub async fn spawn_on(port: u16) -> std::io::Result<MockServerHandle> {
    let state = Arc::new(AppState {
        queue: Mutex::new(MockQueue::default()),
    });

    let app = Router::new()
        .route("/_mock/expect", post(load_expectations))
        .route("/_mock/reset", post(reset_queue))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/responses", post(responses))
        .with_state(state);

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let address = listener.local_addr()?;

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            log::error!("mock server exited: {}", err);
        }
    });

    Ok(MockServerHandle { address, task })
}

async fn load_expectations(State(state): State<Arc<AppState>>, Json(responses): Json<Vec<MockResponse>>) -> Json<serde_json::Value> {
    let mut queue = match state.queue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            eprintln!("mock server: mutex poisoned, recovering queue");
            poisoned.into_inner()
        }
    };
    queue.responses.extend(responses);
    Json(serde_json::json!({ "queued": queue.responses.len() }))
}

async fn reset_queue(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut queue = match state.queue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            eprintln!("mock server: mutex poisoned, recovering queue");
            poisoned.into_inner()
        }
    };
    queue.responses.clear();
    Json(serde_json::json!({ "ok": true }))
}

fn pop_next(state: &AppState) -> MockResponse {
    let mut queue = match state.queue.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            eprintln!("mock server: mutex poisoned, recovering queue");
            poisoned.into_inner()
        }
    };
    queue
        .responses
        .pop_front()
        .unwrap_or_else(|| MockResponse::Text { content: "This is a scripted test response.".to_string() })
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct IncomingRequest {
    model: Option<String>,
    #[serde(default)]
    stream: bool,
}

// ===================== Chat Completions dialect =====================

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IncomingRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let model = request.model.unwrap_or_else(|| "mock-model".to_string());
    let response = pop_next(&state);
    let events = chat_events_for(&model, response);
    Sse::new(stream::iter(events.into_iter().map(Ok))).keep_alive(KeepAlive::default())
}

fn chat_events_for(model: &str, response: MockResponse) -> Vec<Event> {
    let mut events = Vec::new();

    match response {
        MockResponse::Error { message, .. } => {
            let payload = serde_json::json!({ "error": { "message": message, "type": "mock_error" } });
            events.push(Event::default().data(payload.to_string()));
        }
        MockResponse::Text { content } => {
            events.push(chat_chunk(model, serde_json::json!({ "role": "assistant", "content": content }), None));
            events.push(chat_chunk(model, serde_json::json!({}), Some("stop")));
        }
        MockResponse::ToolCalls { calls } => {
            for (index, call) in calls.iter().enumerate() {
                let delta = serde_json::json!({
                    "tool_calls": [{
                        "index": index,
                        "id": format!("call_{}", index),
                        "function": { "name": call.name, "arguments": call.arguments_json },
                    }]
                });
                events.push(chat_chunk(model, delta, None));
            }
            events.push(chat_chunk(model, serde_json::json!({}), Some("tool_calls")));
        }
    }

    events.push(Event::default().data("[DONE]"));
    events
}

fn chat_chunk(model: &str, delta: serde_json::Value, finish_reason: Option<&str>) -> Event {
    let payload = serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "model": model,
        "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }],
        "usage": serde_json::Value::Null,
    });
    Event::default().data(payload.to_string())
}

// ===================== Responses dialect =====================

async fn responses(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IncomingRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let model = request.model.unwrap_or_else(|| "mock-model".to_string());
    let response = pop_next(&state);
    let events = responses_events_for(&model, response);
    Sse::new(stream::iter(events.into_iter().map(Ok))).keep_alive(KeepAlive::default())
}

fn named_event(name: &str, data: serde_json::Value) -> Event {
    Event::default().event(name).data(data.to_string())
}

fn responses_events_for(model: &str, response: MockResponse) -> Vec<Event> {
    let mut events = vec![named_event(
        "response.created",
        serde_json::json!({ "response": { "id": "resp-mock", "model": model, "status": "in_progress" } }),
    )];

    match response {
        MockResponse::Error { message, .. } => {
            events.push(named_event(
                "error",
                serde_json::json!({ "error": { "type": "server_error", "message": message } }),
            ));
            return events;
        }
        MockResponse::Text { content } => {
            events.push(named_event(
                "response.output_text.delta",
                serde_json::json!({ "content_index": 0, "delta": content }),
            ));
        }
        MockResponse::ToolCalls { calls } => {
            for (index, call) in calls.iter().enumerate() {
                let call_id = format!("call_{}", index);
                events.push(named_event(
                    "response.output_item.added",
                    serde_json::json!({
                        "output_index": index,
                        "item": { "type": "function_call", "call_id": call_id, "name": call.name }
                    }),
                ));
                events.push(named_event(
                    "response.function_call_arguments.delta",
                    serde_json::json!({ "output_index": index, "delta": call.arguments_json }),
                ));
                events.push(named_event(
                    "response.function_call_arguments.done",
                    serde_json::json!({ "output_index": index }),
                ));
                events.push(named_event(
                    "response.output_item.done",
                    serde_json::json!({ "output_index": index }),
                ));
            }
        }
    }

    events.push(named_event(
        "response.completed",
        serde_json::json!({
            "response": {
                "status": "completed",
                "usage": { "input_tokens": 10, "output_tokens": 15, "total_tokens": 25 },
            }
        }),
    ));

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_ends_with_done_sentinel() {
        let events = chat_events_for("mock-model", MockResponse::Text { content: "hi".to_string() });
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn responses_text_includes_created_and_completed() {
        let events = responses_events_for("mock-model", MockResponse::Text { content: "hi".to_string() });
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn responses_error_emits_bare_error_event_and_stops() {
        let events = responses_events_for(
            "mock-model",
            MockResponse::Error { status: 500, message: "boom".to_string() },
        );
        // created + error, no response.completed after a failure.
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn responses_tool_calls_emit_lifecycle_per_call() {
        let events = responses_events_for(
            "mock-model",
            MockResponse::ToolCalls {
                calls: vec![MockToolCall { name: "get_weather".to_string(), arguments_json: "{}".to_string() }],
            },
        );
        // created + (added, args delta, args done, item done) + completed
        assert_eq!(events.len(), 6);
    }
}
