//! Anthropic LLM Provider
//!
//! Messages API with tool use. The system prompt travels outside the message
//! list, tool requests are `tool_use` content blocks on the assistant turn,
//! and results are `tool_result` blocks inside a user turn.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use analyst_core::{
    Conversation, GenerationOptions, LlmProvider, ModelTurn, ProviderInfo, Result, Role, ToolInvocation,
    ToolSpec,
};

use crate::transport::{build_client, join_url, send_json};
use crate::{DEFAULT_TIMEOUT_SECS, env_parse, env_var};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

const BACKEND: &str = "Anthropic";

/// Anthropic provider configuration
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    pub api_key: String,

    /// API root, without the `/v1/messages` suffix
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub options: GenerationOptions,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            options: GenerationOptions::new(DEFAULT_MODEL),
        }
    }

    /// `ANTHROPIC_MODEL`, `ANTHROPIC_BASE_URL`, `ANTHROPIC_MAX_TOKENS` and
    /// `ANTHROPIC_TIMEOUT_SECS` override the defaults
    pub fn from_env(api_key: impl Into<String>) -> Self {
        let mut config = Self::new(api_key);
        if let Some(model) = env_var("ANTHROPIC_MODEL") {
            config.options.model = model;
        }
        if let Some(base_url) = env_var("ANTHROPIC_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(max_tokens) = env_parse("ANTHROPIC_MAX_TOKENS") {
            config.options.max_tokens = max_tokens;
        }
        if let Some(timeout) = env_parse("ANTHROPIC_TIMEOUT_SECS") {
            config.timeout_secs = timeout;
        }
        config
    }
}

/// Anthropic messages provider
pub struct AnthropicProvider {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    pub fn from_config(config: AnthropicConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config,
        })
    }

    fn build_request<'a>(&'a self, conversation: &Conversation, tools: &'a [ToolSpec]) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.options.model,
            max_tokens: self.config.options.max_tokens,
            system: conversation.system_prompt(),
            messages: render_messages(conversation),
            tools: tools
                .iter()
                .map(|spec| WireTool {
                    name: &spec.name,
                    description: &spec.description,
                    input_schema: spec.json_schema(),
                })
                .collect(),
            temperature: self.config.options.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: BACKEND.into(),
            model: self.config.options.model.clone(),
        }
    }

    async fn send_turn(&self, conversation: &Conversation, tools: &[ToolSpec]) -> Result<ModelTurn> {
        let body = self.build_request(conversation, tools);
        tracing::debug!(messages = body.messages.len(), tools = body.tools.len(), "Sending messages request");

        let request = self
            .client
            .post(join_url(&self.config.base_url, "v1/messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let response: MessagesResponse = send_json(request, BACKEND).await?;
        Ok(parse_turn(response))
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: Value,
}

#[derive(Serialize, Debug, PartialEq)]
struct WireMessage {
    role: &'static str,
    content: Vec<Block>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    /// Block kinds this client does not act on
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Block>,
}

// ============================================================================
// Conversion
// ============================================================================

fn render_messages(conversation: &Conversation) -> Vec<WireMessage> {
    let mut wire: Vec<WireMessage> = Vec::new();

    for m in conversation.messages() {
        match m.role {
            Role::System => {}
            Role::User => wire.push(WireMessage {
                role: "user",
                content: vec![Block::Text { text: m.content.clone() }],
            }),
            Role::Assistant => {
                let mut content = Vec::with_capacity(m.tool_calls.len() + 1);
                if !m.content.is_empty() {
                    content.push(Block::Text { text: m.content.clone() });
                }
                content.extend(m.tool_calls.iter().map(|call| Block::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: tool_input(&call.arguments),
                }));
                wire.push(WireMessage { role: "assistant", content });
            }
            Role::Tool => {
                let block = Block::ToolResult {
                    tool_use_id: m.tool_call_id.clone().unwrap_or_default(),
                    content: m.content.clone(),
                };
                // Results of one batch share a single user turn
                match wire.last_mut() {
                    Some(last) if is_result_turn(last) => last.content.push(block),
                    _ => wire.push(WireMessage {
                        role: "user",
                        content: vec![block],
                    }),
                }
            }
        }
    }
    wire
}

fn is_result_turn(message: &WireMessage) -> bool {
    message.role == "user"
        && !message.content.is_empty()
        && message.content.iter().all(|b| matches!(b, Block::ToolResult { .. }))
}

/// `input` must be an object on the wire
fn tool_input(arguments: &Value) -> Value {
    if arguments.is_object() { arguments.clone() } else { json!({}) }
}

fn parse_turn(response: MessagesResponse) -> ModelTurn {
    let mut text = String::new();
    let mut invocations = Vec::new();

    for block in response.content {
        match block {
            Block::Text { text: part } => text.push_str(&part),
            Block::ToolUse { id, name, input } => invocations.push(ToolInvocation::new(Some(id), name, input)),
            Block::ToolResult { .. } | Block::Other => {}
        }
    }
    ModelTurn::from_parts(text, invocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::{Message, ParamSpec};

    fn provider() -> AnthropicProvider {
        AnthropicProvider::from_config(AnthropicConfig::new("sk-ant-test")).unwrap()
    }

    fn conversation() -> Conversation {
        let first = ToolInvocation::new(Some("toolu_1".into()), "inspect_data", json!({}));
        let second = ToolInvocation::new(Some("toolu_2".into()), "dedupe", json!({"subset": []}));

        let mut conversation = Conversation::with_system_prompt("Be precise.");
        conversation.push(Message::user("Tidy the data"));
        conversation.push(Message::assistant_with_tools("Looking first.", vec![first.clone(), second.clone()]));
        conversation.push(Message::tool(&first, "Shape: (3, 2)"));
        conversation.push(Message::tool(&second, "Removed 0 duplicate rows. New shape: (3, 2)"));
        conversation
    }

    #[test]
    fn test_config_defaults() {
        let config = AnthropicConfig::new("k");
        assert_eq!(config.options.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.options.max_tokens, 4096);
        assert_eq!(config.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_request_body() {
        let provider = provider();
        let tools = [ToolSpec::new("inspect_data", "Inspect").param(ParamSpec::integer("num_rows", "Rows"))];
        let body = serde_json::to_value(provider.build_request(&conversation(), &tools)).unwrap();

        assert_eq!(body["system"], "Be precise.");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["tools"][0]["name"], "inspect_data");
        assert_eq!(body["tools"][0]["input_schema"]["properties"]["num_rows"]["type"], "integer");

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["content"][0], json!({"type": "text", "text": "Looking first."}));
        assert_eq!(messages[1]["content"][2]["type"], "tool_use");
        assert_eq!(messages[1]["content"][2]["input"], json!({"subset": []}));

        let results = messages[2]["content"].as_array().unwrap();
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["type"], "tool_result");
        assert_eq!(results[1]["tool_use_id"], "toolu_2");
    }

    #[test]
    fn test_non_object_input_is_replaced() {
        assert_eq!(tool_input(&Value::String("{bad".into())), json!({}));
        assert_eq!(tool_input(&json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_parse_mixed_content() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "I'll inspect the data."},
                {"type": "tool_use", "id": "toolu_9", "name": "inspect_data", "input": {"num_rows": 5}},
                {"type": "thinking", "thinking": "..."}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        let ModelTurn::ToolsRequested { text, invocations } = parse_turn(response) else {
            panic!("expected tool request");
        };
        assert_eq!(text, "I'll inspect the data.");
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].id, "toolu_9");
        assert_eq!(invocations[0].arguments, json!({"num_rows": 5}));
    }

    #[test]
    fn test_parse_text_only() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "Done. "}, {"type": "text", "text": "Two regions."}]
        }))
        .unwrap();
        assert_eq!(parse_turn(response), ModelTurn::FinalAnswer { text: "Done. Two regions.".into() });
    }
}
