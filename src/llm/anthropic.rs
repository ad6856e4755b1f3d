// Anthropic Provider implementation using reqwest + SSE streaming
// Supports Claude models including Opus 4.5, Sonnet 3.5/4, and Haiku 3.5
//
// This provider keeps using the `eventsource-stream` crate for SSE parsing
// (unlike `crate::llm::openai`, whose reassembler is hand-rolled): it
// normalizes onto the same `OwnedStreamEvent`/`StreamingContext` types the
// core uses, but Anthropic's own chunk-boundary semantics aren't the subject
// this crate is built and tested against.

use crate::llm::provider::*;
use crate::llm::streaming::{ErrorCategory, FinishReason, OwnedStreamEvent, StreamingContext, Usage};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::{Arc, RwLock};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    config: Arc<RwLock<ProviderConfig>>,
    state: Arc<RwLock<ProviderState>>,
    history: Arc<RwLock<Vec<Message>>>,
}

impl AnthropicProvider {
    pub fn new(model: String, api_key: String) -> Result<Self, ProviderError> {
        if !Self::is_supported_model(&model) {
            return Err(ProviderError::ConfigError(format!(
                "Model '{}' may not be supported. Continue at your own risk.",
                model
            )));
        }

        if api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "Anthropic API key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            config: Arc::new(RwLock::new(ProviderConfig::default())),
            state: Arc::new(RwLock::new(ProviderState::default())),
            history: Arc::new(RwLock::new(Vec::new())),
        })
    }

    fn is_supported_model(model: &str) -> bool {
        matches!(
            model,
            "claude-opus-4-5-20251101"
                | "claude-sonnet-4-5-20250929"
                | "claude-3-5-haiku-20241022"
                | "claude-3-7-sonnet-20250219"
                | "claude-sonnet-4-20250514"
        ) || model.starts_with("claude-")
    }

    fn build_request_body(
        &self,
        history: &[Message],
        _cfg: &ProviderConfig,
        _tools: Option<&[Tool]>,
    ) -> (Vec<AnthropicMessage>, Option<AnthropicSystemPrompt>) {
        let mut messages = Vec::new();
        let mut system_prompt: Option<AnthropicSystemPrompt> = None;

        for msg in history {
            match msg.role {
                Role::System => {
                    if system_prompt.is_none() {
                        system_prompt = Some(AnthropicSystemPrompt::Text(msg.content.clone()));
                    }
                }
                Role::User => {
                    if msg.tool_call_id.is_some() {
                        continue;
                    }

                    messages.push(AnthropicMessage {
                        role: "user".to_string(),
                        content: AnthropicContent::Text(msg.content.clone()),
                    });
                }
                Role::Assistant => {
                    let mut content_blocks = Vec::new();

                    if !msg.content.is_empty() {
                        content_blocks.push(AnthropicContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }

                    if let Some(tool_calls) = &msg.tool_calls {
                        for call in tool_calls {
                            content_blocks.push(AnthropicContentBlock::ToolUse {
                                id: call.id.clone(),
                                name: call.name.clone(),
                                input: call.arguments.clone(),
                            });
                        }
                    }

                    if !content_blocks.is_empty() {
                        messages.push(AnthropicMessage {
                            role: "assistant".to_string(),
                            content: AnthropicContent::Blocks(content_blocks),
                        });
                    }
                }
                Role::Tool => {
                    if let Some(tool_call_id) = &msg.tool_call_id {
                        messages.push(AnthropicMessage {
                            role: "user".to_string(),
                            content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
                                tool_use_id: tool_call_id.clone(),
                                content: msg.content.clone(),
                                is_error: Some(false),
                            }]),
                        });
                    }
                }
            }
        }

        (messages, system_prompt)
    }

    #[allow(dead_code)]
    fn convert_tools(tools: &[Tool]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|tool| AnthropicTool {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.parameters.clone(),
            })
            .collect()
    }

    fn update_usage_state(&self, usage: &AnthropicUsage) {
        if let Ok(mut state) = self.state.write() {
            state.input_tokens += usage.input_tokens as u64;
            state.output_tokens += usage.output_tokens as u64;
            state.cached_tokens += (usage.cache_creation_input_tokens.unwrap_or(0)
                + usage.cache_read_input_tokens.unwrap_or(0)) as u64;
            state.request_count += 1;
            state.last_request_time = Some(std::time::SystemTime::now());
        }
    }

    /// Maps Anthropic's `stop_reason` onto the shared closed vocabulary
    /// (spec §4.2's mapping style, generalized to this provider's wire values).
    fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
        match reason {
            Some("end_turn") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            Some("tool_use") => FinishReason::ToolUse,
            Some("stop_sequence") => FinishReason::Stop,
            _ => FinishReason::Unknown,
        }
    }

    fn build_create_message_request(
        &self,
        messages: Vec<AnthropicMessage>,
        system: Option<AnthropicSystemPrompt>,
        tools: Option<Vec<AnthropicTool>>,
        cfg: &ProviderConfig,
        stream: bool,
    ) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: cfg.max_tokens,
            messages,
            system,
            temperature: Some(1.0),
            top_p: None,
            top_k: None,
            stop_sequences: None,
            stream: Some(stream),
            tool_choice: if tools.is_some() { Some(AnthropicToolChoice::Auto) } else { None },
            tools,
            thinking: None,
            metadata: None,
        }
    }

    #[allow(dead_code)]
    fn prune_message_tool_turns(history: &mut Vec<Message>, max_turns: usize) {
        if max_turns == 0 {
            return;
        }

        let mut tool_turn_ranges: Vec<(usize, usize)> = Vec::new();
        let mut i = 0;

        while i < history.len() {
            if let Message { role: Role::Assistant, tool_calls: Some(_), .. } = &history[i] {
                let start = i;
                i += 1;

                while i < history.len() {
                    if matches!(history[i], Message { role: Role::Tool, .. }) {
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
            let to_remove = tool_turn_ranges.len() - max_turns;
            for &(start, end) in tool_turn_ranges.iter().take(to_remove).rev() {
                history.drain(start..end);
            }
        }
    }
}

#[async_trait::async_trait]
impl LLMProvider for AnthropicProvider {
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
        let mut history = Vec::new();

        if let Some(system_prompt) = &cfg.system_prompt {
            history.push(Message {
                role: Role::System,
                content: system_prompt.clone(),
                tool_call_id: None,
                tool_calls: None,
            });
        }

        history.push(Message {
            role: Role::User,
            content: prompt.to_string(),
            tool_call_id: None,
            tool_calls: None,
        });

        let (messages, system) = self.build_request_body(&history, &cfg, None);
        let request_body = self.build_create_message_request(messages, system, None, &cfg, true);

        let response = self
            .client
            .post(format!("{}/messages", ANTHROPIC_API_BASE))
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ProviderError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let category = error_category_from_status(status.as_u16());
            log::warn!("anthropic stream request failed: {:?} HTTP {}: {}", category, status, text);
            return Err(ProviderError::StreamError(format!("{:?}: Anthropic HTTP {}: {}", category, status, text)));
        }

        let usage_state = self.state.clone();
        let byte_stream = response.bytes_stream();
        let event_stream = byte_stream.eventsource();

        let output_stream = async_stream::stream! {
            let mut ctx = StreamingContext::new();
            ctx.started = true;
            yield Ok(OwnedStreamEvent::Start { model: None });

            futures::pin_mut!(event_stream);

            while let Some(event_result) = event_stream.next().await {
                let event = match event_result {
                    Ok(event) => event,
                    Err(err) => {
                        yield Ok(OwnedStreamEvent::Error {
                            category: ErrorCategory::Network,
                            message: format!("Anthropic stream error: {}", err),
                        });
                        return;
                    }
                };

                if event.event == "message_stop" {
                    break;
                }
                if event.data.trim().is_empty() {
                    continue;
                }

                match event.event.as_str() {
                    "content_block_start" => {
                        if let Ok(block_start) = serde_json::from_str::<ContentBlockStart>(&event.data) {
                            if let AnthropicContentBlock::ToolUse { id, name, .. } = block_start.content_block {
                                ctx.start_tool_call(block_start.index as i64, &id, &name);
                                yield Ok(OwnedStreamEvent::ToolCallStart { index: block_start.index as u32, id, name });
                            }
                        }
                    }
                    "content_block_delta" => {
                        if let Ok(delta) = serde_json::from_str::<ContentBlockDelta>(&event.data) {
                            match delta.delta {
                                ContentDelta::TextDelta { text } => {
                                    yield Ok(OwnedStreamEvent::TextDelta { index: delta.index as u32, text });
                                }
                                ContentDelta::ThinkingDelta { thinking } => {
                                    yield Ok(OwnedStreamEvent::ThinkingDelta { index: delta.index as u32, text: thinking });
                                }
                                ContentDelta::InputJsonDelta { partial_json } => {
                                    ctx.append_tool_args(&partial_json);
                                    yield Ok(OwnedStreamEvent::ToolCallDelta { index: delta.index as u32, arguments: partial_json });
                                }
                            }
                        }
                    }
                    "content_block_stop" => {
                        if ctx.in_tool_call {
                            let index = ctx.tool_call_index as u32;
                            ctx.end_tool_call();
                            yield Ok(OwnedStreamEvent::ToolCallDone { index });
                        }
                    }
                    "message_delta" => {
                        if let Ok(msg_delta) = serde_json::from_str::<MessageDelta>(&event.data) {
                            ctx.finish_reason = Self::parse_finish_reason(msg_delta.delta.stop_reason.as_deref());
                            if let Some(usage) = msg_delta.usage {
                                if let Ok(mut state) = usage_state.write() {
                                    state.output_tokens += usage.output_tokens as u64;
                                    state.request_count += 1;
                                    state.last_request_time = Some(std::time::SystemTime::now());
                                }
                                ctx.usage = Usage {
                                    input_tokens: ctx.usage.input_tokens,
                                    output_tokens: usage.output_tokens as u64,
                                    thinking_tokens: 0,
                                    total_tokens: 0,
                                }.with_computed_total(None);
                            }
                        }
                    }
                    _ => {}
                }
            }

            yield Ok(OwnedStreamEvent::Done { finish_reason: ctx.finish_reason, usage: ctx.usage });
        };

        Ok(Box::pin(output_stream))
    }

    fn prompt_cache(&mut self, _cache_prompt: String) -> Result<(), ProviderError> {
        Err(ProviderError::CachingNotSupported)
    }

    async fn compact(&self, _history: Vec<Message>) -> Result<Vec<Message>, ProviderError> {
        Err(ProviderError::ApiError("Anthropic compact not implemented".to_string()))
    }

    fn get_history(&self) -> Vec<Message> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }
}

// ============================== API types ==============================

#[derive(Debug, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<AnthropicSystemPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<AnthropicToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<AnthropicThinking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
enum AnthropicSystemPrompt {
    Text(String),
    #[allow(dead_code)]
    Blocks(Vec<AnthropicSystemBlock>),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[allow(dead_code)]
struct AnthropicSystemBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[allow(dead_code)]
struct CacheControl {
    #[serde(rename = "type")]
    cache_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    #[allow(dead_code)]
    Image { source: ImageSource },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: serde_json::Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    #[serde(rename = "thinking")]
    #[allow(dead_code)]
    Thinking { thinking: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[allow(dead_code)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct AnthropicTool {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
enum AnthropicToolChoice {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "any")]
    #[allow(dead_code)]
    Any {
        #[serde(skip_serializing_if = "Option::is_none")]
        disable_parallel_tool_use: Option<bool>,
    },
    #[serde(rename = "tool")]
    #[allow(dead_code)]
    Tool { name: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[allow(dead_code)]
struct AnthropicThinking {
    #[serde(rename = "type")]
    thinking_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    budget_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_creation_input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_read_input_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStart {
    index: usize,
    content_block: AnthropicContentBlock,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDelta {
    index: usize,
    delta: ContentDelta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    delta: MessageDeltaContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<AnthropicUsageDelta>,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaContent {
    stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequence: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsageDelta {
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_stop_reasons() {
        assert_eq!(AnthropicProvider::parse_finish_reason(Some("end_turn")), FinishReason::Stop);
        assert_eq!(AnthropicProvider::parse_finish_reason(Some("max_tokens")), FinishReason::Length);
        assert_eq!(AnthropicProvider::parse_finish_reason(Some("tool_use")), FinishReason::ToolUse);
        assert_eq!(AnthropicProvider::parse_finish_reason(Some("stop_sequence")), FinishReason::Stop);
        assert_eq!(AnthropicProvider::parse_finish_reason(Some("bogus")), FinishReason::Unknown);
        assert_eq!(AnthropicProvider::parse_finish_reason(None), FinishReason::Unknown);
    }

    #[test]
    fn rejects_empty_api_key() {
        let result = AnthropicProvider::new("claude-sonnet-4-20250514".to_string(), "".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn accepts_any_claude_prefixed_model() {
        assert!(AnthropicProvider::is_supported_model("claude-future-model-2099"));
        assert!(!AnthropicProvider::is_supported_model("gpt-4o"));
    }

    #[test]
    fn prune_message_tool_turns_keeps_recent_turns() {
        let mut history = vec![
            Message { role: Role::Assistant, content: "t1".to_string(), tool_call_id: None, tool_calls: Some(vec![]) },
            Message { role: Role::Tool, content: "r1".to_string(), tool_call_id: Some("c1".to_string()), tool_calls: None },
            Message { role: Role::Assistant, content: "t2".to_string(), tool_calls: Some(vec![]), tool_call_id: None },
            Message { role: Role::Tool, content: "r2".to_string(), tool_call_id: Some("c2".to_string()), tool_calls: None },
        ];
        AnthropicProvider::prune_message_tool_turns(&mut history, 1);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "t2");
    }
}
