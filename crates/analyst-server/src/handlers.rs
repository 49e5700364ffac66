//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use analyst_core::artifact::{MIME_CSV, MIME_PNG, MIME_XLSX};
use analyst_core::{Agent, AgentError, Cell};
use analyst_runtime::NO_BACKEND_MESSAGE;

use crate::state::AppState;

/// Rows returned by the preview endpoint
const PREVIEW_ROWS: usize = 10;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub csv_path: String,
    pub rows: usize,
    pub columns: usize,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub file_id: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub files: Vec<FileInfo>,
    pub action_log: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub total_rows: usize,
    pub total_columns: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("File not found")]
    NotFound,

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, error) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            Self::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            Self::Agent(e @ AgentError::Config(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", e.user_message())
            }
            Self::Agent(e) => {
                tracing::error!(error = %e, "Agent error");
                (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", e.user_message())
            }
        };
        (
            status,
            Json(ErrorResponse {
                error,
                code: code.into(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Parse an uploaded CSV body and store it under a fresh id
pub async fn upload(
    State(state): State<AppState>,
    params: Result<Query<UploadParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ServerError> {
    let Query(params) = params?;
    if !params.filename.to_lowercase().ends_with(".csv") {
        return Err(ServerError::BadRequest("Only CSV files are allowed".into()));
    }

    let dataset = analyst_tools::read_csv(&body)
        .map_err(|e| ServerError::BadRequest(format!("Could not read CSV: {e}")))?;
    let (rows, columns) = dataset.shape();

    let file_id = uuid::Uuid::new_v4().to_string();
    let csv_path = format!("{file_id}.csv");
    state.storage.put_dataset(&file_id, &params.filename, dataset);
    state.storage.put_file(&csv_path, &params.filename, body.to_vec());

    tracing::info!(file_id = %file_id, filename = %params.filename, rows, columns, "Dataset uploaded");

    Ok(Json(UploadResponse {
        message: format!("Successfully loaded {rows} rows and {columns} columns from {}.", params.filename),
        file_id,
        filename: params.filename,
        csv_path,
        rows,
        columns,
    }))
}

/// Run the analysis loop over a copy of a stored dataset
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServerError> {
    let Json(payload) = payload?;
    let stored = state.storage.dataset(&payload.file_id).ok_or(ServerError::NotFound)?;
    let provider = state
        .provider
        .clone()
        .ok_or_else(|| AgentError::Config(NO_BACKEND_MESSAGE.into()))?;

    tracing::info!(file_id = %payload.file_id, filename = %stored.filename, "Chat request");
    let agent = Agent::new(provider, state.tools.clone(), state.agent_config.clone());
    let outcome = agent.run(&payload.message, &stored.dataset).await?;

    let action_log = outcome.action_log_lines();
    let files = outcome
        .artifacts
        .into_iter()
        .map(|artifact| {
            let file_id = format!("{}_{}", payload.file_id, artifact.id);
            state.storage.put_file(&file_id, &artifact.filename, artifact.bytes);
            FileInfo {
                file_id,
                filename: artifact.filename,
                mime_type: artifact.mime_type,
            }
        })
        .collect();

    Ok(Json(ChatResponse {
        response: outcome.response,
        files,
        action_log,
    }))
}

/// Serve a stored file as an attachment
pub async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ServerError> {
    let file = state.storage.file(&file_id).ok_or(ServerError::NotFound)?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&file_id).to_string()),
            (header::CONTENT_DISPOSITION, attachment(&file.filename)),
        ],
        file.bytes,
    )
        .into_response())
}

/// First rows of a stored dataset as column-keyed objects
pub async fn preview(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<PreviewResponse>, ServerError> {
    let dataset = state.storage.dataset(&file_id).ok_or(ServerError::NotFound)?.dataset;

    let rows = dataset
        .rows()
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| {
            dataset
                .columns()
                .iter()
                .zip(row)
                .map(|(name, cell)| (name.clone(), cell_json(cell)))
                .collect()
        })
        .collect();

    Ok(Json(PreviewResponse {
        columns: dataset.columns().to_vec(),
        rows,
        total_rows: dataset.row_count(),
        total_columns: dataset.column_count(),
    }))
}

/// Content-Disposition value; quotes and control characters become `_`
fn attachment(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

fn content_type(file_id: &str) -> &'static str {
    if file_id.ends_with(".csv") {
        MIME_CSV
    } else if file_id.ends_with(".xlsx") {
        MIME_XLSX
    } else if file_id.ends_with(".png") {
        MIME_PNG
    } else {
        "application/octet-stream"
    }
}

fn cell_json(cell: &Cell) -> Value {
    match cell {
        Cell::Missing => Value::Null,
        Cell::Number(v) => Value::from(*v),
        Cell::Text(s) => Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use analyst_core::{AgentConfig, Conversation, LlmProvider, ModelTurn, ProviderInfo, ToolInvocation, ToolSpec};

    use super::*;
    use crate::storage::Storage;

    struct ScriptedProvider {
        turns: Mutex<VecDeque<ModelTurn>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: "Scripted".into(),
                model: "test".into(),
            }
        }

        async fn send_turn(&self, _conversation: &Conversation, _tools: &[ToolSpec]) -> analyst_core::Result<ModelTurn> {
            Ok(self
                .turns
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ModelTurn::FinalAnswer { text: "done".into() }))
        }
    }

    fn app(provider: Option<Arc<dyn LlmProvider>>) -> Router {
        crate::app(AppState {
            provider,
            tools: Arc::new(analyst_tools::default_registry()),
            storage: Arc::new(Storage::new()),
            agent_config: AgentConfig::default(),
        })
    }

    fn provider_calling(tool: &str, arguments: Value, answer: &str) -> Arc<dyn LlmProvider> {
        Arc::new(ScriptedProvider {
            turns: Mutex::new(
                vec![
                    ModelTurn::ToolsRequested {
                        text: String::new(),
                        invocations: vec![ToolInvocation::new(Some("call_1".into()), tool, arguments)],
                    },
                    ModelTurn::FinalAnswer { text: answer.into() },
                ]
                .into(),
            ),
        })
    }

    fn exporting_provider() -> Arc<dyn LlmProvider> {
        provider_calling("export_csv", json!({"filename": "clean"}), "Exported.")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn upload_request(filename: &str, csv: &'static str) -> Request<Body> {
        Request::post(format!("/api/upload?filename={filename}"))
            .body(Body::from(csv))
            .unwrap()
    }

    fn chat_request(file_id: &str) -> Request<Body> {
        Request::post("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"message": "Export it", "file_id": file_id}).to_string()))
            .unwrap()
    }

    async fn upload_sales(app: &Router) -> String {
        let (status, body) = send_json(app, upload_request("sales.csv", "region,sales\nA,10\nB,\n")).await;
        assert_eq!(status, StatusCode::OK);
        body["file_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send_json(&app(None), Request::get("/healthz").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_upload_and_preview() {
        let app = app(None);
        let (status, body) = send_json(&app, upload_request("sales.csv", "region,sales\nA,10\nB,\n")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"], 2);
        assert_eq!(body["columns"], 2);
        let file_id = body["file_id"].as_str().unwrap();
        assert_eq!(body["csv_path"], format!("{file_id}.csv"));

        let (status, preview) = send_json(
            &app,
            Request::get(format!("/api/preview/{file_id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(preview["columns"], json!(["region", "sales"]));
        assert_eq!(preview["rows"][0], json!({"region": "A", "sales": 10.0}));
        assert_eq!(preview["rows"][1]["sales"], Value::Null);
        assert_eq!(preview["total_rows"], 2);

        let (status, csv) = send(
            &app,
            Request::get(format!("/api/download/{file_id}.csv")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(csv, b"region,sales\nA,10\nB,\n");
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let app = app(None);
        let (status, body) = send_json(&app, upload_request("report.pdf", "a,b\n1,2\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = send_json(&app, upload_request("bad.csv", "a,b\n1,2,3\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let app = app(None);
        let (status, body) = send_json(&app, chat_request("missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "File not found");

        let (status, _) = send(&app, Request::get("/api/download/nope.png").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_without_backend() {
        let app = app(None);
        let file_id = upload_sales(&app).await;

        let (status, body) = send_json(&app, chat_request(&file_id)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], NO_BACKEND_MESSAGE);
        assert_eq!(body["code"], "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_chat_stores_artifacts() {
        let app = app(Some(exporting_provider()));
        let file_id = upload_sales(&app).await;

        let (status, body) = send_json(&app, chat_request(&file_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Exported.");
        assert_eq!(
            body["action_log"],
            json!([r#"Executing: export_csv with args {"filename":"clean"}"#])
        );

        let artifact_id = format!("{file_id}_export_0.csv");
        assert_eq!(
            body["files"],
            json!([{"file_id": artifact_id, "filename": "clean.csv", "type": "text/csv"}])
        );

        let response = app
            .clone()
            .oneshot(Request::get(format!("/api/download/{artifact_id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"clean.csv\""
        );
    }

    #[tokio::test]
    async fn test_malformed_requests_get_json_errors() {
        let app = app(None);
        let (status, body) = send_json(&app, Request::post("/api/upload").body(Body::from("a\n1\n")).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let request = Request::post("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"message\": "))
            .unwrap();
        let (status, body) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plot_title_with_newline_downloads() {
        let provider = provider_calling(
            "plot",
            json!({"plot_type": "bar", "x_column": "region", "y_column": "sales", "title": "Sales\nby region"}),
            "Plotted.",
        );
        let app = app(Some(provider));
        let file_id = upload_sales(&app).await;

        let (status, body) = send_json(&app, chat_request(&file_id)).await;
        assert_eq!(status, StatusCode::OK);
        let artifact_id = body["files"][0]["file_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(Request::get(format!("/api/download/{artifact_id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], MIME_PNG);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Sales_by_region.png\""
        );
    }

    #[test]
    fn test_attachment_replaces_unsafe_characters() {
        assert_eq!(attachment("a\"b\tc\r\n.png"), "attachment; filename=\"a_b_c__.png\"");
        assert_eq!(attachment("Café.xlsx"), "attachment; filename=\"Café.xlsx\"");
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type("x_plot_0.png"), MIME_PNG);
        assert_eq!(content_type("x_export_1.xlsx"), MIME_XLSX);
        assert_eq!(content_type("blob"), "application/octet-stream");
    }
}
