//! Tool System
//!
//! Provider-neutral tool catalog and name-based dispatch.
//! Tools are registered once at startup and invoked by the reasoning loop
//! against the current dataset snapshot.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::artifact::ArtifactDraft;
use crate::dataset::Dataset;
use crate::error::ToolError;

/// Tool invocation requested by the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlation token assigned by the provider; echoed on the result turn
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Raw arguments as sent by the model
    #[serde(default)]
    pub arguments: Value,
}

impl ToolInvocation {
    /// Create an invocation, generating a correlation token when the backend
    /// did not supply one.
    pub fn new(id: Option<String>, name: impl Into<String>, arguments: Value) -> Self {
        let id = id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
        Self {
            id,
            name: name.into(),
            arguments,
        }
    }
}

/// Primitive parameter kinds shared by every supported backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    StringArray,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::StringArray => "array",
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    fn new(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: None,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::Integer, description)
    }

    pub fn string_array(name: &str, description: &str) -> Self {
        Self::new(name, ParamKind::StringArray, description)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Tool definition (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Ordered parameter definitions
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON Schema `object` describing the parameters; both backends embed it as-is.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut property = json!({
                "type": param.kind.json_type(),
                "description": param.description,
            });
            if param.kind == ParamKind::StringArray {
                property["items"] = json!({ "type": "string" });
            }
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            if param.required {
                required.push(param.name.clone());
            }
            properties.insert(param.name.clone(), property);
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

/// Arguments of one invocation, with typed accessors
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Accept a JSON object, or `null` as "no arguments".
    pub fn from_value(value: &Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(map) => Ok(Self(map.clone())),
            Value::Null => Ok(Self::default()),
            _ => Err(ToolError::Failed(
                "arguments must be a JSON object".into(),
            )),
        }
    }

    /// Present, non-null value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Required string parameter
    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.opt_str(name)?
            .ok_or_else(|| ToolError::MissingArgument(name.into()))
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ToolError::invalid(name, "must be a string")),
        }
    }

    /// Non-negative integer; numeric strings are accepted
    pub fn opt_usize(&self, name: &str) -> Result<Option<usize>, ToolError> {
        let invalid = || ToolError::invalid(name, "must be a non-negative integer");
        match self.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .map(Some)
                .ok_or_else(invalid),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }

    /// List of strings; absent means empty
    pub fn str_list(&self, name: &str) -> Result<Vec<String>, ToolError> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(String::from)
                        .ok_or_else(|| ToolError::invalid(name, "must contain only strings"))
                })
                .collect(),
            Some(_) => Err(ToolError::invalid(name, "must be an array of strings")),
        }
    }
}

impl fmt::Display for ToolArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

/// Successful tool output
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    /// Text fed back to the model
    pub text: String,

    /// Replacement snapshot, for tools that reshape the data
    pub dataset: Option<Dataset>,

    /// Generated file, for plot/export tools
    pub artifact: Option<ArtifactDraft>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: ArtifactDraft) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

/// Handler result: output, or a soft failure reported back to the model
pub type ToolResult = std::result::Result<ToolOutput, ToolError>;

/// Tool trait - implement to add new capabilities
pub trait Tool: Send + Sync {
    /// Get the tool's spec for LLM function calling
    fn spec(&self) -> ToolSpec;

    /// Run against a dataset snapshot. Must not mutate shared state.
    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult;

    /// Validate arguments before execution
    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        for param in self.spec().parameters.iter().filter(|p| p.required) {
            if !args.contains(&param.name) {
                return Err(ToolError::MissingArgument(param.name.clone()));
            }
        }
        Ok(())
    }
}

/// Registry for available tools, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; a tool with the same name is replaced in place
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_boxed(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.spec().name;
        if let Some(&slot) = self.index.get(&name) {
            self.tools[slot] = tool;
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// Catalog sent to the model on every turn
    pub fn list_tools(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.spec().name).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute one invocation. Never fails: unknown names, bad arguments,
    /// handler errors and handler panics all come back as result text with
    /// no replacement dataset.
    pub fn dispatch(&self, name: &str, arguments: &Value, dataset: &Dataset) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = %name, "Model requested unknown tool");
            return ToolOutput::text(format!("Unknown function: {name}"));
        };

        let result = ToolArgs::from_value(arguments).and_then(|args| {
            tool.validate(&args)?;
            panic::catch_unwind(AssertUnwindSafe(|| tool.execute(&args, dataset)))
                .unwrap_or_else(|payload| Err(ToolError::Failed(panic_message(&*payload))))
        });

        match result {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(tool = %name, error = %err, "Tool failed");
                ToolOutput::text(format!("Error running {name}: {err}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".into());
    format!("internal failure ({detail})")
}
