//! Reasoning Loop
//!
//! Drives one analysis request: the model observes the dataset through tools,
//! acts on it, and eventually answers. The loop owns the current dataset
//! snapshot, the action log and the artifact ledger for the whole request.

use std::sync::Arc;

use crate::artifact::ArtifactLedger;
use crate::dataset::Dataset;
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::outcome::{ActionLogEntry, AnalysisOutcome, Termination};
use crate::provider::{LlmProvider, ModelTurn};
use crate::tool::ToolRegistry;

/// Response returned when the iteration cap is reached
pub const ITERATION_LIMIT_RESPONSE: &str = "Analysis complete. Check the action log for details.";

const DEFAULT_MAX_ITERATIONS: usize = 10;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a data analysis assistant. You have access to tools to analyze and manipulate data.
Always inspect the data first before performing operations.
Explain each step clearly in plain English.
Never hallucinate column names - only use columns that exist in the dataframe.
Be precise and accurate in your analysis.";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt
    pub system_prompt: String,

    /// Maximum model round-trips before giving up
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl AgentConfig {
    /// Defaults, with `ANALYST_MAX_ITERATIONS` applied when set and positive
    pub fn from_env() -> Self {
        let max_iterations = std::env::var("ANALYST_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_MAX_ITERATIONS);

        Self {
            max_iterations,
            ..Default::default()
        }
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Seed the conversation: instructions, then the request with a dataset brief
    fn seed(&self, request: &str, dataset: &Dataset) -> Conversation {
        let mut conversation = Conversation::with_system_prompt(self.config.system_prompt.clone());
        conversation.push(Message::user(format!(
            "Here's what I need: {request}\n\nThe dataframe has {}",
            dataset.brief()
        )));
        conversation
    }

    /// Run one analysis request against a private copy of `dataset`.
    ///
    /// Provider failures abort the request. Tool failures never do; they are
    /// reported to the model as result text.
    pub async fn run(&self, request: &str, dataset: &Dataset) -> Result<AnalysisOutcome> {
        let provider = self.provider.info();
        tracing::info!(
            provider = %provider.name,
            model = %provider.model,
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Starting analysis"
        );

        let catalog = self.tools.list_tools();
        let mut conversation = self.seed(request, dataset);
        let mut current = dataset.clone();
        let mut action_log = Vec::new();
        let mut artifacts = ArtifactLedger::new();

        for iteration in 1..=self.config.max_iterations {
            match self.provider.send_turn(&conversation, &catalog).await? {
                ModelTurn::FinalAnswer { text } => {
                    tracing::info!(iteration, actions = action_log.len(), "Analysis answered");
                    conversation.push(Message::assistant(text.clone()));
                    return Ok(AnalysisOutcome {
                        response: text,
                        action_log,
                        artifacts: artifacts.into_inner(),
                        dataset: current,
                        iterations: iteration,
                        termination: Termination::Answered,
                        conversation,
                    });
                }
                ModelTurn::ToolsRequested { text, invocations } => {
                    tracing::debug!(iteration, count = invocations.len(), "Model requested tools");
                    conversation.push(Message::assistant_with_tools(text, invocations.clone()));

                    for call in &invocations {
                        action_log.push(ActionLogEntry::new(&call.name, &call.arguments));
                        tracing::info!(tool = %call.name, id = %call.id, "Executing tool");

                        let output = self.tools.dispatch(&call.name, &call.arguments, &current);
                        if let Some(next) = output.dataset {
                            current = next;
                        }
                        if let Some(draft) = output.artifact {
                            artifacts.record(draft);
                        }
                        conversation.push(Message::tool(call, output.text));
                    }
                }
            }
        }

        tracing::warn!(
            max_iterations = self.config.max_iterations,
            actions = action_log.len(),
            "Iteration limit reached"
        );
        Ok(AnalysisOutcome {
            response: ITERATION_LIMIT_RESPONSE.into(),
            action_log,
            artifacts: artifacts.into_inner(),
            dataset: current,
            iterations: self.config.max_iterations,
            termination: Termination::IterationLimit,
            conversation,
        })
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Arc::new(ToolRegistry::new()),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        Ok(Agent::new(provider, self.tools, self.config))
    }
}
