// Gemini Provider implementation using reqwest + SSE streaming
// Supports gemini-3-pro-preview and gemini-3-flash-preview models
//
// Like `anthropic`, this provider normalizes onto the shared
// `OwnedStreamEvent`/`StreamingContext` types via `eventsource-stream`
// rather than the hand-rolled reassembler in `crate::llm::openai`.

use crate::llm::provider::*;
use crate::llm::streaming::{ErrorCategory, OwnedStreamEvent, StreamingContext, Usage};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Metadata for tracked tool calls. Gemini's function calls arrive whole in
/// a single part rather than fragmented across deltas, but still need a
/// synthesized call id and a remembered signature for the next turn's
/// request (the `thoughtSignature` Gemini 3 requires echoed back).
#[derive(Debug, Clone)]
struct GeminiToolCallMeta {
    signature: Option<String>,
    #[allow(dead_code)]
    function_name: String,
}

#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    config: Arc<RwLock<ProviderConfig>>,
    state: Arc<RwLock<ProviderState>>,
    history: Arc<RwLock<Vec<Message>>>,
    tool_call_meta: Arc<RwLock<HashMap<String, GeminiToolCallMeta>>>,
    call_counter: Arc<AtomicU64>,
}

impl GeminiProvider {
    pub fn new(model: String, api_key: String) -> Result<Self, ProviderError> {
        if !Self::is_supported_model(&model) {
            return Err(ProviderError::ConfigError(format!(
                "Model '{}' is not supported. Supported models: gemini-3-pro-preview, gemini-3-flash-preview",
                model
            )));
        }

        if api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError("Gemini API key must not be empty".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            config: Arc::new(RwLock::new(ProviderConfig::default())),
            state: Arc::new(RwLock::new(ProviderState::default())),
            history: Arc::new(RwLock::new(Vec::new())),
            tool_call_meta: Arc::new(RwLock::new(HashMap::new())),
            call_counter: Arc::new(AtomicU64::new(1)),
        })
    }

    fn is_supported_model(model: &str) -> bool {
        matches!(model, "gemini-3-pro-preview" | "gemini-3-flash-preview")
    }

    fn next_call_id(&self) -> String {
        let idx = self.call_counter.fetch_add(1, Ordering::SeqCst);
        format!("gemini_call_{}", idx)
    }

    fn register_tool_call(&self, call_id: String, meta: GeminiToolCallMeta) {
        if let Ok(mut map) = self.tool_call_meta.write() {
            map.insert(call_id, meta);
        }
    }

    fn get_tool_signature(&self, call_id: &str) -> Option<GeminiToolCallMeta> {
        self.tool_call_meta.read().ok().and_then(|m| m.get(call_id).cloned())
    }

    fn build_request_body(
        &self,
        history: &[Message],
        _cfg: &ProviderConfig,
        tools: Option<&[Tool]>,
    ) -> (Vec<GeminiContent>, Option<GeminiContent>, Option<Vec<GeminiTool>>) {
        let mut contents = Vec::new();
        let mut system_instruction: Option<GeminiContent> = None;

        for msg in history {
            match msg.role {
                Role::System => {
                    if system_instruction.is_none() {
                        system_instruction = Some(GeminiContent {
                            role: None,
                            parts: vec![GeminiPart {
                                text: Some(msg.content.clone()),
                                ..Default::default()
                            }],
                        });
                    }
                }
                Role::User => {
                    contents.push(GeminiContent {
                        role: Some("user".to_string()),
                        parts: vec![GeminiPart {
                            text: Some(msg.content.clone()),
                            ..Default::default()
                        }],
                    });
                }
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(GeminiPart {
                            text: Some(msg.content.clone()),
                            ..Default::default()
                        });
                    }

                    if let Some(tool_calls) = &msg.tool_calls {
                        for call in tool_calls {
                            let signature = self.get_tool_signature(&call.id).and_then(|meta| meta.signature);

                            parts.push(GeminiPart {
                                thought_signature: signature,
                                function_call: Some(GeminiFunctionCall {
                                    name: call.name.clone(),
                                    args: call.arguments.clone(),
                                }),
                                ..Default::default()
                            });
                        }
                    }

                    contents.push(GeminiContent {
                        role: Some("model".to_string()),
                        parts,
                    });
                }
                Role::Tool => {
                    if let Some(call_id) = &msg.tool_call_id {
                        let name = self
                            .get_tool_signature(call_id)
                            .map(|meta| meta.function_name)
                            .unwrap_or_else(|| "tool".to_string());

                        let response_value = Self::parse_tool_response_json(&msg.content);

                        contents.push(GeminiContent {
                            role: Some("user".to_string()),
                            parts: vec![GeminiPart {
                                function_response: Some(GeminiFunctionResponse { name, response: response_value }),
                                ..Default::default()
                            }],
                        });
                    }
                }
            }
        }

        let gemini_tools = tools.map(Self::convert_tools);

        (contents, system_instruction, gemini_tools)
    }

    #[allow(dead_code)]
    fn convert_tools(tools: &[Tool]) -> Vec<GeminiTool> {
        vec![GeminiTool {
            function_declarations: tools
                .iter()
                .map(|tool| GeminiFunctionDeclaration {
                    name: tool.name.clone(),
                    description: Some(tool.description.clone()),
                    parameters: tool.parameters.clone(),
                })
                .collect(),
        }]
    }

    fn parse_tool_response_json(payload: &str) -> serde_json::Value {
        serde_json::from_str(payload).unwrap_or_else(|_| serde_json::json!({ "result": payload }))
    }

    fn update_usage_state(&self, usage: &UsageMetadata) {
        if let Ok(mut state) = self.state.write() {
            state.input_tokens += usage.prompt_token_count.unwrap_or(0) as u64;
            state.output_tokens += usage.candidates_token_count.unwrap_or(0) as u64;
            state.cached_tokens += usage.cached_content_token_count.unwrap_or(0) as u64;
            state.request_count += 1;
            state.last_request_time = Some(std::time::SystemTime::now());
        }
    }

    fn build_generation_config(cfg: &ProviderConfig) -> Option<GeminiGenerationConfig> {
        Some(GeminiGenerationConfig {
            temperature: Some(1.0), // Gemini 3 prefers temperature 1.0
            max_output_tokens: Some(cfg.max_tokens),
            thinking_config: cfg.extra_options.get("thinking_level").and_then(|value| {
                value.as_str().map(|level| GeminiThinkingConfig {
                    thinking_level: level.to_string(),
                })
            }),
        })
    }

    /// Maps Gemini's `finishReason` onto the shared closed vocabulary.
    fn parse_finish_reason(reason: Option<&str>) -> crate::llm::streaming::FinishReason {
        use crate::llm::streaming::FinishReason;
        match reason {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        }
    }

    fn build_stream_request(
        &self,
        contents: Vec<GeminiContent>,
        system_instruction: Option<GeminiContent>,
        tools: Option<Vec<GeminiTool>>,
        cfg: &ProviderConfig,
    ) -> GenerateContentRequest {
        let tool_config = tools.as_ref().map(|_| GeminiToolConfig {
            function_calling_config: Some(GeminiFunctionCallingConfig { mode: "AUTO".to_string() }),
        });

        GenerateContentRequest {
            contents,
            tools,
            system_instruction,
            generation_config: Self::build_generation_config(cfg),
            tool_config,
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
impl LLMProvider for GeminiProvider {
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

        let (contents, system_instruction, _) = self.build_request_body(&history, &cfg, None);
        let request_body = self.build_stream_request(contents, system_instruction, None, &cfg);

        let response = self
            .client
            .post(format!("{}/models/{}:streamGenerateContent?alt=sse", GEMINI_API_BASE, self.model))
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ProviderError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let category = error_category_from_status(status.as_u16());
            log::warn!("gemini stream request failed: {:?} HTTP {}: {}", category, status, text);
            return Err(ProviderError::StreamError(format!("{:?}: Gemini HTTP {}: {}", category, status, text)));
        }

        let provider = self.clone();
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
                            message: format!("Gemini stream error: {}", err),
                        });
                        return;
                    }
                };

                if event.data.trim().is_empty() || event.data == "[DONE]" {
                    continue;
                }

                let resp: GenerateContentResponse = match serde_json::from_str(&event.data) {
                    Ok(resp) => resp,
                    Err(_) => continue,
                };

                if let Some(candidate) = resp.candidates.and_then(|c| c.into_iter().next()) {
                    if let Some(reason) = candidate.finish_reason.as_deref() {
                        ctx.finish_reason = Self::parse_finish_reason(Some(reason));
                    }

                    if let Some(content) = candidate.content {
                        for part in content.parts {
                            if let Some(text) = part.text {
                                yield Ok(OwnedStreamEvent::TextDelta { index: 0, text });
                            }

                            if let Some(function_call) = part.function_call {
                                let call_id = provider.next_call_id();
                                provider.register_tool_call(
                                    call_id.clone(),
                                    GeminiToolCallMeta {
                                        signature: part.thought_signature.clone(),
                                        function_name: function_call.name.clone(),
                                    },
                                );
                                let arguments = serde_json::to_string(&function_call.args).unwrap_or_else(|_| "{}".to_string());

                                ctx.start_tool_call(0, &call_id, &function_call.name);
                                yield Ok(OwnedStreamEvent::ToolCallStart { index: 0, id: call_id, name: function_call.name });
                                ctx.append_tool_args(&arguments);
                                yield Ok(OwnedStreamEvent::ToolCallDelta { index: 0, arguments });
                                ctx.end_tool_call();
                                yield Ok(OwnedStreamEvent::ToolCallDone { index: 0 });
                            }
                        }
                    }
                }

                if let Some(usage) = resp.usage_metadata {
                    provider.update_usage_state(&usage);
                    ctx.usage = Usage {
                        input_tokens: usage.prompt_token_count.unwrap_or(0) as u64,
                        output_tokens: usage.candidates_token_count.unwrap_or(0) as u64,
                        thinking_tokens: 0,
                        total_tokens: 0,
                    }
                    .with_computed_total(None);

                    yield Ok(OwnedStreamEvent::Done { finish_reason: ctx.finish_reason, usage: ctx.usage });
                }
            }
        };

        Ok(Box::pin(output_stream))
    }

    fn prompt_cache(&mut self, _cache_prompt: String) -> Result<(), ProviderError> {
        Err(ProviderError::CachingNotSupported)
    }

    async fn compact(&self, _history: Vec<Message>) -> Result<Vec<Message>, ProviderError> {
        Err(ProviderError::ApiError("Gemini compact not implemented".to_string()))
    }

    fn get_history(&self) -> Vec<Message> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }
}

// ============================== API types ==============================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(rename = "toolConfig", skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
struct GeminiPart {
    #[serde(rename = "thought", skip_serializing_if = "Option::is_none")]
    #[allow(dead_code)]
    thought: Option<bool>,
    #[serde(rename = "thoughtSignature", skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(rename = "functionResponse", skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiToolConfig {
    #[serde(rename = "functionCallingConfig", skip_serializing_if = "Option::is_none")]
    function_calling_config: Option<GeminiFunctionCallingConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCallingConfig {
    mode: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(rename = "thinkingConfig", skip_serializing_if = "Option::is_none")]
    thinking_config: Option<GeminiThinkingConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiThinkingConfig {
    #[serde(rename = "thinkingLevel")]
    thinking_level: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize, Clone)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "cachedContentTokenCount")]
    cached_content_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gemini_3_models_supported() {
        assert!(GeminiProvider::is_supported_model("gemini-3-pro-preview"));
        assert!(GeminiProvider::is_supported_model("gemini-3-flash-preview"));
        assert!(!GeminiProvider::is_supported_model("gemini-1.5-pro"));
    }

    #[test]
    fn rejects_empty_api_key() {
        let result = GeminiProvider::new("gemini-3-pro-preview".to_string(), "".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn parses_known_finish_reasons() {
        use crate::llm::streaming::FinishReason;
        assert_eq!(GeminiProvider::parse_finish_reason(Some("STOP")), FinishReason::Stop);
        assert_eq!(GeminiProvider::parse_finish_reason(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(GeminiProvider::parse_finish_reason(Some("SAFETY")), FinishReason::ContentFilter);
        assert_eq!(GeminiProvider::parse_finish_reason(Some("RECITATION")), FinishReason::ContentFilter);
        assert_eq!(GeminiProvider::parse_finish_reason(None), FinishReason::Unknown);
    }

    #[test]
    fn tool_response_json_falls_back_to_wrapping_raw_text() {
        let value = GeminiProvider::parse_tool_response_json("not json");
        assert_eq!(value, serde_json::json!({ "result": "not json" }));

        let value = GeminiProvider::parse_tool_response_json(r#"{"ok":true}"#);
        assert_eq!(value, serde_json::json!({ "ok": true }));
    }

    #[test]
    fn call_ids_are_unique_and_sequential_per_provider() {
        let provider = GeminiProvider::new("gemini-3-flash-preview".to_string(), "key".to_string()).unwrap();
        let first = provider.next_call_id();
        let second = provider.next_call_id();
        assert_ne!(first, second);
    }
}
