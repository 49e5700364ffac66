//! Error Types

use thiserror::Error;

use crate::dataset::DatasetError;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Every variant is fatal for the current request. Tool failures are not
/// represented here; see [`ToolError`].
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error (non-success response, malformed body)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unreachable
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Response could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::Parse(_) => "The AI service returned a response that could not be understood.".into(),
            Self::Config(msg) => msg.clone(),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication with the AI service failed. Please check your API key.".into(),
        }
    }
}

/// Soft tool failure
///
/// Rendered into the tool result text and fed back to the model so it can
/// correct itself. Never aborts a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("missing required parameter '{0}'")]
    MissingArgument(String),

    #[error("parameter '{name}' {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("column '{0}' not found in dataset")]
    ColumnNotFound(String),

    #[error("column '{0}' has no numeric values")]
    NotNumeric(String),

    #[error("unsupported aggregation function '{0}' (use sum, mean, count, min or max)")]
    UnsupportedFunction(String),

    #[error("invalid plot configuration: {0}")]
    InvalidPlot(String),

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<DatasetError> for ToolError {
    fn from(err: DatasetError) -> Self {
        Self::Failed(err.to_string())
    }
}
