//! # analyst-core
//!
//! Core analyst agent with provider-agnostic LLM abstraction and a
//! dataset-centred tool system.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Agent                              │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools     │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry   │──│   (Strategy)        │  │
//! │  └──────┬──────┘  └──────────────┘  └─────────────────────┘  │
//! │         │  Dataset snapshot · action log · artifact ledger   │
//! └─────────┴────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait hides the differences between function-calling
//! backends; the reasoning loop only sees `ModelTurn::FinalAnswer` or
//! `ModelTurn::ToolsRequested`.

pub mod artifact;
pub mod dataset;
pub mod error;
pub mod message;
pub mod outcome;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use artifact::{ArtifactDraft, ArtifactKind, GeneratedArtifact};
pub use dataset::{Cell, ColumnType, Dataset, DatasetError};
pub use error::{AgentError, Result, ToolError};
pub use message::{Conversation, Message, Role};
pub use outcome::{ActionLogEntry, AnalysisOutcome, Termination};
pub use provider::{GenerationOptions, LlmProvider, ModelTurn, ProviderInfo};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolInvocation, ToolOutput, ToolRegistry, ToolResult, ToolSpec};
