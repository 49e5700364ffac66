//! OpenAI LLM Provider
//!
//! Chat-completions with function calling. Tool calls arrive on the
//! assistant message as `tool_calls`, each with its arguments encoded as a
//! JSON string; results go back as `role: "tool"` messages.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use analyst_core::{
    AgentError, Conversation, GenerationOptions, LlmProvider, ModelTurn, ProviderInfo, Result, Role,
    ToolInvocation, ToolSpec,
};

use crate::transport::{build_client, join_url, send_json};
use crate::{DEFAULT_TIMEOUT_SECS, env_parse, env_var};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const BACKEND: &str = "OpenAI";

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// API root, without the `/chat/completions` suffix
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub options: GenerationOptions,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            options: GenerationOptions::new(DEFAULT_MODEL),
        }
    }

    /// `OPENAI_MODEL`, `OPENAI_BASE_URL` and `OPENAI_TIMEOUT_SECS` override the defaults
    pub fn from_env(api_key: impl Into<String>) -> Self {
        let mut config = Self::new(api_key);
        if let Some(model) = env_var("OPENAI_MODEL") {
            config.options.model = model;
        }
        if let Some(base_url) = env_var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = env_parse("OPENAI_TIMEOUT_SECS") {
            config.timeout_secs = timeout;
        }
        config
    }
}

/// OpenAI chat-completions provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config,
        })
    }

    fn build_request<'a>(&'a self, conversation: &Conversation, tools: &'a [ToolSpec]) -> ChatRequest<'a> {
        let tools: Vec<ChatTool<'a>> = tools.iter().map(ChatTool::from_spec).collect();
        ChatRequest {
            model: &self.config.options.model,
            messages: render_messages(conversation),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            max_tokens: self.config.options.max_tokens,
            temperature: self.config.options.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: BACKEND.into(),
            model: self.config.options.model.clone(),
        }
    }

    async fn send_turn(&self, conversation: &Conversation, tools: &[ToolSpec]) -> Result<ModelTurn> {
        let body = self.build_request(conversation, tools);
        tracing::debug!(messages = body.messages.len(), tools = body.tools.len(), "Sending chat completion");

        let request = self
            .client
            .post(join_url(&self.config.base_url, "chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body);

        parse_turn(send_json(request, BACKEND).await?)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Debug, PartialEq)]
struct ChatMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct ChatTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDef<'a>,
}

#[derive(Serialize)]
struct FunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: Value,
}

impl<'a> ChatTool<'a> {
    fn from_spec(spec: &'a ToolSpec) -> Self {
        Self {
            kind: "function",
            function: FunctionDef {
                name: &spec.name,
                description: &spec.description,
                parameters: spec.json_schema(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".into()
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

// ============================================================================
// Conversion
// ============================================================================

fn render_messages(conversation: &Conversation) -> Vec<ChatMessage> {
    conversation
        .messages()
        .iter()
        .map(|m| match m.role {
            Role::System | Role::User => ChatMessage {
                role: if m.role == Role::System { "system" } else { "user" },
                content: Some(m.content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            Role::Assistant => ChatMessage {
                role: "assistant",
                content: (!m.content.is_empty() || m.tool_calls.is_empty()).then(|| m.content.clone()),
                tool_calls: m.has_tool_calls().then(|| m.tool_calls.iter().map(encode_call).collect()),
                tool_call_id: None,
            },
            Role::Tool => ChatMessage {
                role: "tool",
                content: Some(m.content.clone()),
                tool_calls: None,
                tool_call_id: m.tool_call_id.clone(),
            },
        })
        .collect()
}

fn encode_call(call: &ToolInvocation) -> WireToolCall {
    // Unparsable arguments were kept as the raw string; send them back unchanged
    let arguments = match &call.arguments {
        Value::String(raw) => raw.clone(),
        Value::Null => "{}".into(),
        other => other.to_string(),
    };
    WireToolCall {
        id: call.id.clone(),
        kind: function_kind(),
        function: WireFunction {
            name: call.name.clone(),
            arguments,
        },
    }
}

fn decode_arguments(name: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(tool = %name, error = %e, "Tool arguments are not valid JSON");
        Value::String(raw.to_string())
    })
}

fn parse_turn(response: ChatResponse) -> Result<ModelTurn> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::Parse("OpenAI response has no choices".into()))?;

    let invocations = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = decode_arguments(&call.function.name, &call.function.arguments);
            ToolInvocation::new(Some(call.id), call.function.name, arguments)
        })
        .collect();

    Ok(ModelTurn::from_parts(choice.message.content.unwrap_or_default(), invocations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::{Message, ParamSpec};
    use serde_json::json;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::from_config(OpenAiConfig::new("sk-test")).unwrap()
    }

    fn conversation() -> Conversation {
        let call = ToolInvocation::new(Some("call_1".into()), "dedupe", json!({"subset": ["region"]}));
        let mut conversation = Conversation::with_system_prompt("Be precise.");
        conversation.push(Message::user("Remove duplicates"));
        conversation.push(Message::assistant_with_tools("", vec![call.clone()]));
        conversation.push(Message::tool(&call, "Removed 1 duplicate rows. New shape: (3, 2)"));
        conversation
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("sk-test");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.options.model, "gpt-4o");
    }

    #[test]
    fn test_request_body() {
        let provider = provider();
        let tools = [ToolSpec::new("dedupe", "Remove duplicate rows")
            .param(ParamSpec::string_array("subset", "Columns"))];
        let body = serde_json::to_value(provider.build_request(&conversation(), &tools)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "dedupe");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["content"], Value::Null);
        assert_eq!(messages[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], r#"{"subset":["region"]}"#);
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_no_tools_means_no_tool_choice() {
        let provider = provider();
        let body = serde_json::to_value(provider.build_request(&conversation(), &[])).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_parse_tool_calls() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "inspect_data", "arguments": "{\"num_rows\": 3}"}},
                        {"id": "call_b", "type": "function", "function": {"name": "plot", "arguments": "{bad json"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let ModelTurn::ToolsRequested { text, invocations } = parse_turn(response).unwrap() else {
            panic!("expected tool request");
        };
        assert!(text.is_empty());
        assert_eq!(invocations[0].id, "call_a");
        assert_eq!(invocations[0].arguments, json!({"num_rows": 3}));
        assert_eq!(invocations[1].arguments, Value::String("{bad json".into()));
    }

    #[test]
    fn test_parse_final_answer() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "Sales peaked in Q3."}}]
        }))
        .unwrap();
        assert_eq!(
            parse_turn(response).unwrap(),
            ModelTurn::FinalAnswer { text: "Sales peaked in Q3.".into() }
        );
    }

    #[test]
    fn test_parse_rejects_empty_choices() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(parse_turn(response), Err(AgentError::Parse(_))));
    }

    #[test]
    fn test_raw_arguments_round_trip() {
        let call = ToolInvocation::new(Some("c".into()), "plot", Value::String("{bad".into()));
        assert_eq!(encode_call(&call).function.arguments, "{bad");
    }
}
