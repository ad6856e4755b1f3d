// OpenAI provider implementation: reqwest + a hand-rolled SSE reassembler.
//
// Unlike the sibling `anthropic`/`gemini` providers, this one does not use
// the `eventsource-stream` crate. The OpenAI family is the one whose
// chunk-boundary reassembly semantics this crate is built and tested
// against (`crate::llm::streaming`), so it gets the purpose-built parser
// instead of the ecosystem default.

use crate::llm::provider::*;
use crate::llm::streaming::{
    self, chat as chat_dialect, responses as responses_dialect, OwnedStreamEvent, SseReassembler,
    StreamingContext,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::{Arc, RwLock};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const OPENAI_RESPONSES_API_BASE: &str = "https://api.openai.com/v1/responses";

/// OpenAI provider implementation
#[derive(Clone)]
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    config: Arc<RwLock<ProviderConfig>>,
    state: Arc<RwLock<ProviderState>>,
    /// Conversation history from the last compact() call
    history: Arc<RwLock<Vec<Message>>>,
}

// Request types matching OpenAI's Chat Completions API.
// Response *shapes* are no longer modeled as typed structs here: the dialect
// state machines in `crate::llm::streaming` read `serde_json::Value`
// directly, since the whole point of the normalized event vocabulary is that
// callers never see the wire shape.

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String, // Always "function"
    function: OpenAIFunction,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "role")]
enum ChatMessage {
    #[serde(rename = "system")]
    System { content: String },
    #[serde(rename = "user")]
    User { content: String },
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<OpenAIToolCall>>,
    },
    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: String, // Always "function"
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String, // JSON string
}

// Request/response types for the Responses dialect (C4) and for compaction.

#[derive(Debug, Serialize)]
struct ResponsesStreamRequest {
    model: String,
    input: Vec<ResponsesInput>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponsesCompactRequest {
    model: String,
    input: Vec<ResponsesInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
enum ResponsesInput {
    Message(ResponsesMessage),
    CompactedItem(CompactedItem),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ResponsesMessage {
    role: String,
    content: ResponsesContent,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
enum ResponsesContent {
    Text(String),
    Parts(Vec<ResponsesContentPart>),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
enum ResponsesContentPart {
    #[serde(rename = "input_text")]
    InputText { text: String },
    #[serde(rename = "output_text")]
    OutputText { text: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct CompactedItem {
    #[serde(rename = "type")]
    item_type: String, // "compacted"
    data: String, // Opaque encrypted data
}

#[derive(Debug, Deserialize)]
struct ResponsesCompactResponse {
    output: Vec<ResponsesInput>,
}

impl OpenAIProvider {
    /// Check if a model is supported (uses max_completion_tokens)
    fn is_supported_model(model: &str) -> bool {
        model.starts_with("gpt-5") || model.starts_with("o1") || model.starts_with("gpt-4o")
    }

    /// Prune old tool call/result turns from history
    /// Keeps only the most recent N turns, where one turn = assistant message with tool_calls + tool results
    #[allow(dead_code)]
    fn prune_tool_turns(messages: &mut Vec<ChatMessage>, max_turns: usize) {
        if max_turns == 0 {
            return;
        }

        let mut tool_turn_ranges: Vec<(usize, usize)> = Vec::new();
        let mut i = 0;

        while i < messages.len() {
            if let ChatMessage::Assistant {
                tool_calls: Some(_),
                ..
            } = &messages[i]
            {
                let start = i;
                i += 1;

                while i < messages.len() {
                    if matches!(&messages[i], ChatMessage::Tool { .. }) {
                        i += 1;
                    } else {
                        break;
                    }
                }

                let end = i;
                tool_turn_ranges.push((start, end));
            } else {
                i += 1;
            }
        }

        if tool_turn_ranges.len() > max_turns {
            let turns_to_remove = tool_turn_ranges.len() - max_turns;
            for &(start, end) in tool_turn_ranges.iter().take(turns_to_remove).rev() {
                messages.drain(start..end);
            }
        }
    }

    fn convert_to_responses_input(msg: &Message) -> ResponsesInput {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        ResponsesInput::Message(ResponsesMessage {
            role: role.to_string(),
            content: ResponsesContent::Text(msg.content.clone()),
        })
    }

    fn convert_from_responses_input(input: &ResponsesInput) -> Result<Message, ProviderError> {
        match input {
            ResponsesInput::Message(msg) => {
                let role = match msg.role.as_str() {
                    "system" => Role::System,
                    "user" => Role::User,
                    "assistant" => Role::Assistant,
                    "tool" => Role::Tool,
                    _ => {
                        return Err(ProviderError::ApiError(format!(
                            "Unknown role: {}",
                            msg.role
                        )))
                    }
                };

                let content = match &msg.content {
                    ResponsesContent::Text(text) => text.clone(),
                    ResponsesContent::Parts(parts) => parts
                        .iter()
                        .filter_map(|part| match part {
                            ResponsesContentPart::InputText { text } => Some(text.as_str()),
                            ResponsesContentPart::OutputText { text } => Some(text.as_str()),
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                };

                Ok(Message {
                    role,
                    content,
                    tool_call_id: None,
                    tool_calls: None,
                })
            }
            ResponsesInput::CompactedItem(_) => Err(ProviderError::ApiError(
                "Cannot convert compacted item to Message".to_string(),
            )),
        }
    }

    fn convert_message(msg: &Message) -> ChatMessage {
        match msg.role {
            Role::System => ChatMessage::System {
                content: msg.content.clone(),
            },
            Role::User => ChatMessage::User {
                content: msg.content.clone(),
            },
            Role::Assistant => {
                let tool_calls = msg.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|tc| OpenAIToolCall {
                            id: tc.id.clone(),
                            tool_type: "function".to_string(),
                            function: OpenAIFunctionCall {
                                name: tc.name.clone(),
                                arguments: serde_json::to_string(&tc.arguments).unwrap_or_default(),
                            },
                        })
                        .collect()
                });

                ChatMessage::Assistant {
                    content: Some(msg.content.clone()),
                    tool_calls,
                }
            }
            Role::Tool => ChatMessage::Tool {
                content: msg.content.clone(),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            },
        }
    }

    #[allow(dead_code)]
    fn convert_tools(tools: &[Tool]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|t| OpenAITool {
                tool_type: "function".to_string(),
                function: OpenAIFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    pub fn new(model: String, api_key: String) -> Result<Self, ProviderError> {
        if !Self::is_supported_model(&model) {
            return Err(ProviderError::ConfigError(format!(
                "Model '{}' not supported. Only GPT-5+ models supported (e.g., gpt-5-nano, o1, gpt-4o)",
                model
            )));
        }

        let client = reqwest::Client::new();

        Ok(Self {
            client,
            api_key,
            model,
            config: Arc::new(RwLock::new(ProviderConfig::default())),
            state: Arc::new(RwLock::new(ProviderState::default())),
            history: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Opens a Chat-Completions-dialect stream (C3) for a single prompt,
    /// reassembling raw bytes with the hand-rolled [`SseReassembler`] rather
    /// than `eventsource-stream`.
    async fn open_chat_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<OwnedStreamEvent, ProviderError>> + Send>>, ProviderError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", OPENAI_API_BASE))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let category = error_category_from_status(status.as_u16());
            log::warn!("openai stream request failed: {:?} HTTP {}: {}", category, status, error_text);
            return Err(ProviderError::StreamError(format!(
                "{:?}: HTTP {}: {}",
                category, status, error_text
            )));
        }

        let state = self.state.clone();
        let mut byte_stream = response.bytes_stream();

        let output_stream = async_stream::stream! {
            let mut reassembler = SseReassembler::new();
            let mut ctx = StreamingContext::new();

            loop {
                let chunk = match byte_stream.next().await {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        yield Err(ProviderError::from(e));
                        return;
                    }
                    None => break,
                };
                reassembler.push(&chunk);

                while let Some(record) = reassembler.next_record() {
                    let mut emitted = Vec::new();
                    chat_dialect::process_record(&record, &mut ctx, |event| emitted.push(OwnedStreamEvent::from(event)));
                    for event in emitted {
                        if matches!(event, OwnedStreamEvent::Done { .. }) {
                            if let Ok(mut s) = state.write() {
                                s.input_tokens += ctx.usage.input_tokens;
                                s.output_tokens += ctx.usage.output_tokens;
                                s.request_count += 1;
                                s.last_request_time = Some(std::time::SystemTime::now());
                            }
                        }
                        yield Ok(event);
                    }
                }
            }
        };

        Ok(Box::pin(output_stream))
    }

    /// Opens a Responses-dialect stream (C4) for a single prompt. Not part
    /// of [`LLMProvider`] — the trait's `chat()` always uses the Chat
    /// dialect; this is exposed directly for callers that specifically want
    /// the Responses API's richer event shape (e.g. reasoning summaries).
    pub async fn chat_responses(
        &self,
        prompt: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<OwnedStreamEvent, ProviderError>> + Send>>, ProviderError> {
        let cfg = self.config();
        let request = ResponsesStreamRequest {
            model: self.model.clone(),
            input: vec![ResponsesInput::Message(ResponsesMessage {
                role: "user".to_string(),
                content: ResponsesContent::Text(prompt.to_string()),
            })],
            stream: true,
            instructions: cfg.system_prompt.clone(),
        };

        let response = self
            .client
            .post(OPENAI_RESPONSES_API_BASE)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let category = error_category_from_status(status.as_u16());
            log::warn!("openai stream request failed: {:?} HTTP {}: {}", category, status, error_text);
            return Err(ProviderError::StreamError(format!(
                "{:?}: HTTP {}: {}",
                category, status, error_text
            )));
        }

        let state = self.state.clone();
        let mut byte_stream = response.bytes_stream();

        let output_stream = async_stream::stream! {
            let mut reassembler = SseReassembler::new();
            let mut ctx = StreamingContext::new();

            loop {
                let chunk = match byte_stream.next().await {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        yield Err(ProviderError::from(e));
                        return;
                    }
                    None => break,
                };
                reassembler.push(&chunk);

                while let Some(record) = reassembler.next_record() {
                    let mut emitted = Vec::new();
                    responses_dialect::process_record(&record, &mut ctx, |event| emitted.push(OwnedStreamEvent::from(event)));
                    for event in emitted {
                        if matches!(event, OwnedStreamEvent::Done { .. }) {
                            if let Ok(mut s) = state.write() {
                                s.input_tokens += ctx.usage.input_tokens;
                                s.output_tokens += ctx.usage.output_tokens;
                                s.request_count += 1;
                                s.last_request_time = Some(std::time::SystemTime::now());
                            }
                        }
                        yield Ok(event);
                    }
                }
            }
        };

        Ok(Box::pin(output_stream))
    }

    /// Builds a full [`streaming::Response`] for a single prompt by driving
    /// the Chat-dialect stream to completion and reading back the
    /// accumulated context (spec §4.5/§4.6).
    pub async fn chat_response(&self, prompt: &str) -> Result<streaming::Response, ProviderError> {
        let mut stream = self.chat(prompt).await?;
        let mut ctx = StreamingContext::new();
        while let Some(event) = stream.next().await {
            match event? {
                OwnedStreamEvent::Start { model } => {
                    if let Some(model) = model {
                        ctx.set_model_if_unset(&model);
                    }
                    ctx.started = true;
                }
                OwnedStreamEvent::ToolCallStart { index, id, name } => {
                    ctx.start_tool_call(index as i64, &id, &name);
                }
                OwnedStreamEvent::ToolCallDelta { arguments, .. } => {
                    ctx.append_tool_args(&arguments);
                }
                OwnedStreamEvent::ToolCallDone { .. } => {
                    ctx.end_tool_call();
                }
                OwnedStreamEvent::Done { finish_reason, usage } => {
                    ctx.finish_reason = finish_reason;
                    ctx.usage = usage;
                }
                OwnedStreamEvent::TextDelta { .. }
                | OwnedStreamEvent::ThinkingDelta { .. }
                | OwnedStreamEvent::Error { .. } => {}
            }
        }
        Ok(streaming::build_response(&ctx))
    }
}

#[async_trait::async_trait]
impl LLMProvider for OpenAIProvider {
    fn create(model: String, api_key: String) -> Result<Self, ProviderError> {
        Self::new(model, api_key)
    }

    fn state(&self) -> ProviderState {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }

    fn config(&self) -> ProviderConfig {
        self.config.read().map(|c| c.clone()).unwrap_or_default()
    }

    fn update_config(&self, f: impl FnOnce(&mut ProviderConfig)) {
        if let Ok(mut config) = self.config.write() {
            f(&mut config);
        }
    }

    async fn chat(
        &self,
        prompt: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<OwnedStreamEvent, ProviderError>> + Send>>, ProviderError> {
        let cfg = self.config();

        let mut messages = vec![];
        if let Some(system_prompt) = &cfg.system_prompt {
            messages.push(ChatMessage::System {
                content: system_prompt.clone(),
            });
        }
        messages.push(ChatMessage::User {
            content: prompt.to_string(),
        });

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(cfg.temperature),
            max_completion_tokens: Some(cfg.max_tokens),
            stream: true,
            stream_options: Some(StreamOptions { include_usage: true }),
            tools: None,
        };

        self.open_chat_stream(request).await
    }

    fn prompt_cache(&mut self, _cache_prompt: String) -> Result<(), ProviderError> {
        Err(ProviderError::CachingNotSupported)
    }

    async fn compact(&self, history: Vec<Message>) -> Result<Vec<Message>, ProviderError> {
        let input: Vec<ResponsesInput> = history.iter().map(Self::convert_to_responses_input).collect();

        let cfg = self.config();
        let request = ResponsesCompactRequest {
            model: self.model.clone(),
            input,
            instructions: cfg.system_prompt.clone(),
        };

        let response = self
            .client
            .post(format!("{}/compact", OPENAI_RESPONSES_API_BASE))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Compact request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "Compact API error HTTP {}: {}",
                status, error_text
            )));
        }

        let compact_response: ResponsesCompactResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse compact response: {}", e)))?;

        let mut compacted_history = Vec::new();
        for input in compact_response.output {
            if let Ok(msg) = Self::convert_from_responses_input(&input) {
                compacted_history.push(msg);
            }
            // Compacted items are opaque and can't be converted back to a
            // Message; they're dropped here rather than threaded through.
        }

        if let Ok(mut hist) = self.history.write() {
            *hist = compacted_history.clone();
        }

        Ok(compacted_history)
    }

    fn get_history(&self) -> Vec<Message> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_models() {
        assert!(OpenAIProvider::is_supported_model("gpt-5-nano"));
        assert!(OpenAIProvider::is_supported_model("gpt-5-turbo"));
        assert!(OpenAIProvider::is_supported_model("gpt-5"));
        assert!(OpenAIProvider::is_supported_model("o1"));
        assert!(OpenAIProvider::is_supported_model("o1-preview"));
        assert!(OpenAIProvider::is_supported_model("o1-mini"));
        assert!(OpenAIProvider::is_supported_model("gpt-4o"));
        assert!(OpenAIProvider::is_supported_model("gpt-4o-mini"));
    }

    #[test]
    fn test_unsupported_models() {
        assert!(!OpenAIProvider::is_supported_model("gpt-4"));
        assert!(!OpenAIProvider::is_supported_model("gpt-4-turbo"));
        assert!(!OpenAIProvider::is_supported_model("gpt-3.5-turbo"));
        assert!(!OpenAIProvider::is_supported_model("text-davinci-003"));
    }

    #[test]
    fn test_create_with_unsupported_model() {
        let result = OpenAIProvider::new("gpt-3.5-turbo".to_string(), "test-key".to_string());
        assert!(result.is_err());

        if let Err(ProviderError::ConfigError(msg)) = result {
            assert!(msg.contains("not supported"));
            assert!(msg.contains("GPT-5+"));
        } else {
            panic!("Expected ConfigError");
        }
    }

    #[test]
    fn test_create_with_supported_model() {
        let result = OpenAIProvider::new("gpt-4o".to_string(), "test-key".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn test_provider_trait_create() {
        let result = <OpenAIProvider as LLMProvider>::create("o1-preview".to_string(), "test-key".to_string());
        assert!(result.is_ok());

        let result = <OpenAIProvider as LLMProvider>::create("gpt-4".to_string(), "test-key".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_prune_tool_turns_no_tools() {
        let mut messages = vec![
            ChatMessage::User { content: "Hello".to_string() },
            ChatMessage::Assistant { content: Some("Hi".to_string()), tool_calls: None },
        ];

        OpenAIProvider::prune_tool_turns(&mut messages, 3);
        assert_eq!(messages.len(), 2);
    }

    fn tool_turn(label: &str, call_id: &str) -> [ChatMessage; 2] {
        [
            ChatMessage::Assistant {
                content: Some(label.to_string()),
                tool_calls: Some(vec![OpenAIToolCall {
                    id: call_id.to_string(),
                    tool_type: "function".to_string(),
                    function: OpenAIFunctionCall {
                        name: "test".to_string(),
                        arguments: "{}".to_string(),
                    },
                }]),
            },
            ChatMessage::Tool {
                content: format!("result for {}", call_id),
                tool_call_id: call_id.to_string(),
            },
        ]
    }

    #[test]
    fn test_prune_tool_turns_under_limit() {
        let mut messages = vec![ChatMessage::User { content: "Hello".to_string() }];
        messages.extend(tool_turn("Turn 1", "call_1"));
        messages.push(ChatMessage::Assistant { content: Some("Done".to_string()), tool_calls: None });

        let original_len = messages.len();
        OpenAIProvider::prune_tool_turns(&mut messages, 3);
        assert_eq!(messages.len(), original_len);
    }

    #[test]
    fn test_prune_tool_turns_exceeds_limit() {
        let mut messages = Vec::new();
        for (label, id) in [("Turn 1", "call_1"), ("Turn 2", "call_2"), ("Turn 3", "call_3"), ("Turn 4", "call_4")] {
            messages.extend(tool_turn(label, id));
        }

        OpenAIProvider::prune_tool_turns(&mut messages, 3);
        assert_eq!(messages.len(), 6);

        if let ChatMessage::Assistant { content: Some(c), .. } = &messages[0] {
            assert_eq!(c, "Turn 2");
        } else {
            panic!("Expected Turn 2 to be first");
        }
    }

    #[test]
    fn test_get_history_initially_empty() {
        let provider = OpenAIProvider::new("gpt-4o".to_string(), "test-key".to_string()).unwrap();
        let history = provider.get_history();
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_prune_tool_turns_multiple_tool_results() {
        let mut messages = vec![
            ChatMessage::Assistant {
                content: Some("Turn 1".to_string()),
                tool_calls: Some(vec![
                    OpenAIToolCall {
                        id: "call_1a".to_string(),
                        tool_type: "function".to_string(),
                        function: OpenAIFunctionCall { name: "test".to_string(), arguments: "{}".to_string() },
                    },
                    OpenAIToolCall {
                        id: "call_1b".to_string(),
                        tool_type: "function".to_string(),
                        function: OpenAIFunctionCall { name: "test".to_string(), arguments: "{}".to_string() },
                    },
                ]),
            },
            ChatMessage::Tool { content: "result 1a".to_string(), tool_call_id: "call_1a".to_string() },
            ChatMessage::Tool { content: "result 1b".to_string(), tool_call_id: "call_1b".to_string() },
        ];
        messages.extend(tool_turn("Turn 2", "call_2"));

        OpenAIProvider::prune_tool_turns(&mut messages, 1);
        assert_eq!(messages.len(), 2);

        if let ChatMessage::Assistant { content: Some(c), .. } = &messages[0] {
            assert_eq!(c, "Turn 2");
        } else {
            panic!("Expected Turn 2");
        }
    }
}
