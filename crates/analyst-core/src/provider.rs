//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for function-calling LLM backends (OpenAI,
//! Anthropic) so the reasoning loop never branches on the backend.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use analyst_core::provider::{LlmProvider, ModelTurn};
//!
//! let provider = OpenAiProvider::from_config(config)?;
//!
//! match provider.send_turn(&conversation, &registry.list_tools()).await? {
//!     ModelTurn::FinalAnswer { text } => println!("{text}"),
//!     ModelTurn::ToolsRequested { invocations, .. } => { /* dispatch */ }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Conversation;
use crate::tool::{ToolInvocation, ToolSpec};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-4o", "claude-3-5-sonnet-20241022")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; backend default when unset
    #[serde(default)]
    pub temperature: Option<f32>,
}

const fn default_max_tokens() -> u32 {
    4096
}

impl GenerationOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

/// The model's next turn, normalized across backends
#[derive(Clone, Debug, PartialEq)]
pub enum ModelTurn {
    /// No tool use requested: the loop ends with this text
    FinalAnswer { text: String },

    /// One or more tool invocations, in emission order, plus any text the
    /// model produced alongside them
    ToolsRequested {
        text: String,
        invocations: Vec<ToolInvocation>,
    },
}

impl ModelTurn {
    /// Classify a parsed response: any invocation means tools were requested.
    pub fn from_parts(text: String, invocations: Vec<ToolInvocation>) -> Self {
        if invocations.is_empty() {
            Self::FinalAnswer { text }
        } else {
            Self::ToolsRequested { text, invocations }
        }
    }
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "OpenAI", "Anthropic")
    pub name: String,

    /// Model in use
    pub model: String,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider information
    fn info(&self) -> ProviderInfo;

    /// Send the conversation and tool catalog; return the model's next turn.
    ///
    /// Transport, authentication and malformed-response failures are
    /// returned as errors and are not retried.
    async fn send_turn(&self, conversation: &Conversation, tools: &[ToolSpec]) -> Result<ModelTurn>;
}
