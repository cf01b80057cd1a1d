//! # Tool Executor
//!
//! The single-call bridge between an orchestrator and the kernel. Maintains
//! a registered table `tool name → (definition, handler)` and validates
//! every parameter bag strictly before the handler sees it.
//!
//! ## Invocation Pipeline
//! ```text
//! execute_tool(name, bag)
//!     │ 1. unknown tool ────────────────► ToolError::UnknownTool
//!     │ 2. declared params:
//!     │      absent + required ─────────► ToolError::MissingParameter
//!     │      present ──► coerce ──fail──► ToolError::Coercion (tool+param+cause)
//!     │ 3. undeclared bag key ──────────► ToolError::UnknownParameter
//!     ▼
//! handler.handle(normalized args)
//! ```
//!
//! Handlers bridge orchestrator intent to kernel operations and NOTHING
//! else: every price comes from the catalog, every total from the engine.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use till_core::KernelError;

use crate::definition::{ParamType, ToolArgs, ToolDefinition, ToolValue};

// =============================================================================
// Errors
// =============================================================================

/// Structural failures at the tool boundary. Domain outcomes (including
/// rejected payments or modifier violations) are NOT errors here - handlers
/// report those in their reply text via the result envelope.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("Tool '{tool}' is missing required parameter '{parameter}'")]
    MissingParameter { tool: String, parameter: String },

    #[error("Tool '{tool}' does not accept parameter '{parameter}'")]
    UnknownParameter { tool: String, parameter: String },

    #[error("Tool '{tool}' parameter '{parameter}' cannot be read as {expected}: {cause}")]
    Coercion {
        tool: String,
        parameter: String,
        expected: &'static str,
        cause: String,
    },

    /// A handler hit a kernel failure it could not express as a reply
    /// (configuration problems, extension I/O).
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

pub type ToolResult<T> = Result<T, ToolError>;

// =============================================================================
// Handler Contract
// =============================================================================

/// What a tool invocation returns to the orchestrator.
#[derive(Debug, Clone)]
pub struct ToolReply {
    pub text: String,
}

impl ToolReply {
    pub fn new(text: impl Into<String>) -> Self {
        ToolReply { text: text.into() }
    }
}

/// One tool's behavior. Receives a fully validated, coerced argument bag.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: ToolArgs) -> ToolResult<ToolReply>;
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

// =============================================================================
// Executor
// =============================================================================

/// Declarative tool registry plus the strict invocation path.
#[derive(Default)]
pub struct ToolExecutor {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        ToolExecutor {
            tools: HashMap::new(),
        }
    }

    /// Registers (or replaces) a tool.
    pub fn register(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        debug!(tool = %definition.name, parameters = definition.parameters.len(), "tool registered");
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                handler,
            },
        );
    }

    /// All registered definitions, sorted by name (for `help`-style output).
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        let mut defs: Vec<&ToolDefinition> = self.tools.values().map(|t| &t.definition).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Validates the raw bag against the declaration and invokes the
    /// handler. Any structural problem fails before the handler runs.
    pub async fn execute_tool(
        &self,
        name: &str,
        bag: &HashMap<String, Value>,
    ) -> ToolResult<ToolReply> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let mut args = ToolArgs::default();
        for parameter in &tool.definition.parameters {
            match bag.get(&parameter.name) {
                None => {
                    if parameter.required {
                        return Err(ToolError::MissingParameter {
                            tool: name.to_string(),
                            parameter: parameter.name.clone(),
                        });
                    }
                }
                Some(raw) => {
                    let value = coerce(name, &parameter.name, parameter.param_type, raw)?;
                    args.insert(parameter.name.clone(), value);
                }
            }
        }

        // Reject silent drift: a key the declaration does not know is an
        // error, not an ignored extra.
        for key in bag.keys() {
            if !tool.definition.parameters.iter().any(|p| &p.name == key) {
                return Err(ToolError::UnknownParameter {
                    tool: name.to_string(),
                    parameter: key.clone(),
                });
            }
        }

        debug!(tool = %name, "tool invocation validated");
        tool.handler.handle(args).await
    }
}

/// Coerces one raw JSON value to its declared type with invariant parsing.
fn coerce(tool: &str, parameter: &str, declared: ParamType, raw: &Value) -> ToolResult<ToolValue> {
    let fail = |expected: &'static str, cause: String| ToolError::Coercion {
        tool: tool.to_string(),
        parameter: parameter.to_string(),
        expected,
        cause,
    };

    match declared {
        ParamType::String => match raw {
            Value::String(s) => Ok(ToolValue::Text(s.clone())),
            Value::Number(n) => Ok(ToolValue::Text(n.to_string())),
            other => Err(fail("string", format!("got {}", json_kind(other)))),
        },
        ParamType::Int => match raw {
            Value::Number(n) => n
                .as_i64()
                .map(ToolValue::Int)
                .ok_or_else(|| fail("int", format!("'{}' is not a whole number", n))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ToolValue::Int)
                .map_err(|e| fail("int", format!("'{}': {}", s, e))),
            other => Err(fail("int", format!("got {}", json_kind(other)))),
        },
        ParamType::Decimal => match raw {
            // Route through the serde_json text form so 7.10 stays 7.10.
            Value::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .map(ToolValue::Decimal)
                .map_err(|e| fail("decimal", format!("'{}': {}", n, e))),
            Value::String(s) => s
                .trim()
                .parse::<Decimal>()
                .map(ToolValue::Decimal)
                .map_err(|e| fail("decimal", format!("'{}': {}", s, e))),
            other => Err(fail("decimal", format!("got {}", json_kind(other)))),
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ToolParameter;
    use rust_decimal_macros::dec;
    use serde_json::json;

    /// Echoes what it received; also proves the handler only ever sees a
    /// validated bag.
    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn handle(&self, args: ToolArgs) -> ToolResult<ToolReply> {
            let amount = args.decimal("amount").unwrap();
            let note = args.text("note").unwrap_or("-");
            Ok(ToolReply::new(format!("amount={} note={}", amount, note)))
        }
    }

    fn executor() -> ToolExecutor {
        let mut executor = ToolExecutor::new();
        executor.register(
            ToolDefinition::new("echo", "test", "echo")
                .with_parameter(ToolParameter::required(
                    "amount",
                    ParamType::Decimal,
                    "an amount",
                ))
                .with_parameter(ToolParameter::optional("note", ParamType::String, "a note")),
            Arc::new(EchoHandler),
        );
        executor
    }

    fn bag(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_happy_path_with_string_coercion() {
        let executor = executor();
        let reply = executor
            .execute_tool("echo", &bag(&[("amount", json!("7.10"))]))
            .await
            .unwrap();
        assert_eq!(reply.text, "amount=7.10 note=-");
    }

    #[tokio::test]
    async fn test_number_decimal_keeps_scale() {
        let executor = executor();
        let reply = executor
            .execute_tool("echo", &bag(&[("amount", json!(7.1))]))
            .await
            .unwrap();
        assert!(reply.text.starts_with("amount=7.1"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let executor = executor();
        let err = executor.execute_tool("nope", &bag(&[])).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_missing_required_parameter() {
        let executor = executor();
        let err = executor
            .execute_tool("echo", &bag(&[("note", json!("hi"))]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ToolError::MissingParameter { ref parameter, .. } if parameter == "amount")
        );
    }

    #[tokio::test]
    async fn test_unknown_parameter_rejected() {
        let executor = executor();
        let err = executor
            .execute_tool(
                "echo",
                &bag(&[("amount", json!("1")), ("surprise", json!("x"))]),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, ToolError::UnknownParameter { ref parameter, .. } if parameter == "surprise")
        );
    }

    #[tokio::test]
    async fn test_uncoercible_value_names_tool_and_parameter() {
        let executor = executor();
        let err = executor
            .execute_tool("echo", &bag(&[("amount", json!("seven"))]))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("echo"));
        assert!(message.contains("amount"));
        assert!(message.contains("decimal"));
    }

    #[tokio::test]
    async fn test_optional_parameter_passthrough() {
        let executor = executor();
        let reply = executor
            .execute_tool(
                "echo",
                &bag(&[("amount", json!(2)), ("note", json!("thanks"))]),
            )
            .await
            .unwrap();
        assert_eq!(reply.text, "amount=2 note=thanks");
    }

    #[test]
    fn test_definitions_sorted() {
        let mut executor = executor();
        executor.register(
            ToolDefinition::new("abacus", "test", "first"),
            Arc::new(EchoHandler),
        );
        let names: Vec<&str> = executor
            .definitions()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, ["abacus", "echo"]);
    }

    #[test]
    fn test_decimal_parse_is_invariant() {
        // Invariant culture: dot decimal point, comma rejected.
        assert_eq!("7.10".parse::<Decimal>().unwrap(), dec!(7.10));
        assert!("7,10".parse::<Decimal>().is_err());
    }
}
