//! Providers against an in-process HTTP backend

use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{MethodRouter, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use analyst_core::{AgentError, Conversation, LlmProvider, Message, ModelTurn, ToolSpec};
use analyst_runtime::{AnthropicConfig, AnthropicProvider, OpenAiConfig, OpenAiProvider};

#[derive(Default)]
struct Recorded {
    bodies: Vec<Value>,
    headers: Vec<HeaderMap>,
}

fn replying(status: StatusCode, reply: Value, recorded: Arc<Mutex<Recorded>>) -> MethodRouter {
    post(move |headers: HeaderMap, Json(body): Json<Value>| {
        let recorded = Arc::clone(&recorded);
        let reply = reply.clone();
        async move {
            let mut recorded = recorded.lock().unwrap();
            recorded.bodies.push(body);
            recorded.headers.push(headers);
            (status, Json(reply))
        }
    })
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn conversation() -> Conversation {
    let mut conversation = Conversation::with_system_prompt("You are a data analyst.");
    conversation.push(Message::user("How many rows?"));
    conversation
}

fn catalog() -> Vec<ToolSpec> {
    vec![ToolSpec::new("inspect_data", "Inspect the dataframe")]
}

#[tokio::test]
async fn test_openai_tool_call_round_trip() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let reply = json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{"id": "call_7", "type": "function", "function": {"name": "inspect_data", "arguments": "{}"}}]
            }
        }]
    });
    let base = serve(Router::new().route(
        "/v1/chat/completions",
        replying(StatusCode::OK, reply, Arc::clone(&recorded)),
    ))
    .await;

    let mut config = OpenAiConfig::new("sk-test");
    config.base_url = format!("{base}/v1");
    let provider = OpenAiProvider::from_config(config).unwrap();

    let turn = provider.send_turn(&conversation(), &catalog()).await.unwrap();
    let ModelTurn::ToolsRequested { invocations, .. } = turn else {
        panic!("expected tool request");
    };
    assert_eq!(invocations[0].id, "call_7");
    assert_eq!(invocations[0].name, "inspect_data");

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.headers[0]["authorization"], "Bearer sk-test");
    assert_eq!(recorded.bodies[0]["messages"][0]["role"], "system");
    assert_eq!(recorded.bodies[0]["tools"][0]["function"]["name"], "inspect_data");
}

#[tokio::test]
async fn test_anthropic_final_answer() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let reply = json!({
        "content": [{"type": "text", "text": "There are 42 rows."}],
        "stop_reason": "end_turn"
    });
    let base = serve(Router::new().route("/v1/messages", replying(StatusCode::OK, reply, Arc::clone(&recorded)))).await;

    let mut config = AnthropicConfig::new("sk-ant-test");
    config.base_url = base;
    let provider = AnthropicProvider::from_config(config).unwrap();

    let turn = provider.send_turn(&conversation(), &catalog()).await.unwrap();
    assert_eq!(turn, ModelTurn::FinalAnswer { text: "There are 42 rows.".into() });

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.headers[0]["x-api-key"], "sk-ant-test");
    assert_eq!(recorded.headers[0]["anthropic-version"], "2023-06-01");
    assert_eq!(recorded.bodies[0]["system"], "You are a data analyst.");
}

#[tokio::test]
async fn test_status_mapping() {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let router = Router::new()
        .route(
            "/auth/chat/completions",
            replying(
                StatusCode::UNAUTHORIZED,
                json!({"error": {"message": "Incorrect API key provided"}}),
                Arc::clone(&recorded),
            ),
        )
        .route(
            "/busy/chat/completions",
            replying(StatusCode::TOO_MANY_REQUESTS, json!({"error": {"message": "Rate limit"}}), Arc::clone(&recorded)),
        )
        .route(
            "/broken/chat/completions",
            replying(StatusCode::OK, json!({"unexpected": true, "choices": "nope"}), Arc::clone(&recorded)),
        );
    let base = serve(router).await;

    let call = |prefix: &str| {
        let mut config = OpenAiConfig::new("sk-test");
        config.base_url = format!("{base}/{prefix}");
        OpenAiProvider::from_config(config).unwrap()
    };

    let err = call("auth").send_turn(&conversation(), &[]).await.unwrap_err();
    assert!(matches!(&err, AgentError::Auth(msg) if msg.contains("Incorrect API key")));

    let err = call("busy").send_turn(&conversation(), &[]).await.unwrap_err();
    assert!(matches!(err, AgentError::RateLimited(_)));

    let err = call("broken").send_turn(&conversation(), &[]).await.unwrap_err();
    assert!(matches!(err, AgentError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let mut config = AnthropicConfig::new("k");
    config.base_url = "http://127.0.0.1:9".into();
    config.timeout_secs = 2;
    let provider = AnthropicProvider::from_config(config).unwrap();

    let err = provider.send_turn(&conversation(), &[]).await.unwrap_err();
    assert!(matches!(err, AgentError::ProviderUnavailable(_)));
}
