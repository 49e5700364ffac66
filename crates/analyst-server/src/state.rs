//! Application State

use std::sync::Arc;

use analyst_core::{AgentConfig, LlmProvider, ToolRegistry};

use crate::storage::Storage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (None when no API key is configured)
    pub provider: Option<Arc<dyn LlmProvider>>,

    /// Tool registry with all available tools
    pub tools: Arc<ToolRegistry>,

    /// Uploaded datasets and generated files
    pub storage: Arc<Storage>,

    /// Loop settings applied to every chat request
    pub agent_config: AgentConfig,
}
