//! # analyst-runtime
//!
//! Function-calling providers for the analyst agent.
//!
//! ## Providers
//!
//! - **OpenAI**: chat-completions with `tool_calls`
//! - **Anthropic**: messages API with `tool_use` blocks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use analyst_runtime::provider_from_env;
//!
//! let provider = provider_from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(provider)
//!     .tools(Arc::new(analyst_tools::default_registry()))
//!     .build()?;
//! ```

pub mod anthropic;
pub mod openai;
mod transport;

use std::str::FromStr;
use std::sync::Arc;

use analyst_core::{AgentError, LlmProvider, Result};

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use analyst_core::{Agent, AgentBuilder, ModelTurn, ToolRegistry};

/// HTTP timeout when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const NO_BACKEND_MESSAGE: &str = "No API key configured. Please set OPENAI_API_KEY or ANTHROPIC_API_KEY";

/// Which backend serves the conversation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    OpenAi,
    Anthropic,
}

/// OpenAI wins when both keys are present. Blank keys count as absent.
pub fn select_backend(openai_key: Option<&str>, anthropic_key: Option<&str>) -> Result<Backend> {
    let present = |key: Option<&str>| key.is_some_and(|k| !k.trim().is_empty());

    if present(openai_key) {
        Ok(Backend::OpenAi)
    } else if present(anthropic_key) {
        Ok(Backend::Anthropic)
    } else {
        Err(AgentError::Config(NO_BACKEND_MESSAGE.into()))
    }
}

/// Build the provider selected by `OPENAI_API_KEY` / `ANTHROPIC_API_KEY`
pub fn provider_from_env() -> Result<Arc<dyn LlmProvider>> {
    let openai_key = env_var("OPENAI_API_KEY");
    let anthropic_key = env_var("ANTHROPIC_API_KEY");

    let provider: Arc<dyn LlmProvider> = match select_backend(openai_key.as_deref(), anthropic_key.as_deref())? {
        Backend::OpenAi => Arc::new(OpenAiProvider::from_config(OpenAiConfig::from_env(
            openai_key.unwrap_or_default(),
        ))?),
        Backend::Anthropic => Arc::new(AnthropicProvider::from_config(AnthropicConfig::from_env(
            anthropic_key.unwrap_or_default(),
        ))?),
    };

    let info = provider.info();
    tracing::info!(provider = %info.name, model = %info.model, "LLM backend selected");
    Ok(provider)
}

/// Non-blank environment variable
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parsed environment variable; unparsable values are ignored with a warning
pub(crate) fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = %name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_precedence() {
        assert_eq!(select_backend(Some("sk"), Some("ant")).unwrap(), Backend::OpenAi);
        assert_eq!(select_backend(None, Some("ant")).unwrap(), Backend::Anthropic);
        assert_eq!(select_backend(Some("  "), Some("ant")).unwrap(), Backend::Anthropic);
    }

    #[test]
    fn test_no_backend() {
        let err = select_backend(None, Some("")).unwrap_err();
        assert!(matches!(&err, AgentError::Config(_)));
        assert_eq!(err.user_message(), NO_BACKEND_MESSAGE);
    }
}
