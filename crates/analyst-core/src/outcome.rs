//! Analysis Outcome

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::artifact::GeneratedArtifact;
use crate::dataset::Dataset;
use crate::message::Conversation;

/// One executed tool invocation, in invocation order
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionLogEntry {
    pub tool: String,
    pub arguments: Value,
}

impl ActionLogEntry {
    pub fn new(tool: &str, arguments: &Value) -> Self {
        Self {
            tool: tool.to_string(),
            arguments: arguments.clone(),
        }
    }
}

impl fmt::Display for ActionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Executing: {} with args {}", self.tool, self.arguments)
    }
}

/// Why the loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model answered without requesting tools
    Answered,
    /// The iteration cap was reached while the model still requested tools
    IterationLimit,
}

/// Everything a request produced
#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    /// Final answer, or the generic completion notice at the iteration cap
    pub response: String,

    pub action_log: Vec<ActionLogEntry>,

    pub artifacts: Vec<GeneratedArtifact>,

    /// Dataset after the last mutating tool; the caller decides whether to keep it
    pub dataset: Dataset,

    /// Model round-trips performed
    pub iterations: usize,

    pub termination: Termination,

    /// Full transcript of the request
    pub conversation: Conversation,
}

impl AnalysisOutcome {
    /// Action log rendered as display lines
    pub fn action_log_lines(&self) -> Vec<String> {
        self.action_log.iter().map(ToString::to_string).collect()
    }
}
