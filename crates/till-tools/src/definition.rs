//! # Tool Definitions
//!
//! Declarative descriptions of the tools an orchestrator may invoke. The
//! executor validates every invocation against these before any handler
//! runs, so drift between the orchestrator's idea of a tool and the
//! kernel's is caught at the boundary, loudly.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Parameter Types
// =============================================================================

/// Declared type of one tool parameter. Coercion uses invariant parsing
/// (`.` decimal point, no grouping), never the host locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Decimal,
}

/// One declared parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ToolParameter {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        ToolParameter {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        ToolParameter {
            name: name.to_string(),
            param_type,
            required: false,
            description: description.to_string(),
        }
    }
}

/// A declarative tool description: name, category tag, human description,
/// declared parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub category: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: &str, category: &str, description: &str) -> Self {
        ToolDefinition {
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

// =============================================================================
// Normalized Arguments
// =============================================================================

/// A value after coercion to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolValue {
    Text(String),
    Int(i64),
    Decimal(Decimal),
}

/// The normalized parameter bag a handler receives: every key declared,
/// every value coerced.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    values: HashMap<String, ToolValue>,
}

impl ToolArgs {
    pub fn insert(&mut self, name: impl Into<String>, value: ToolValue) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ToolValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ToolValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn decimal(&self, name: &str) -> Option<Decimal> {
        match self.values.get(name) {
            Some(ToolValue::Decimal(d)) => Some(*d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_definition_builder() {
        let def = ToolDefinition::new("pay", "transaction", "Apply a tender")
            .with_parameter(ToolParameter::required(
                "amount",
                ParamType::Decimal,
                "Amount tendered",
            ))
            .with_parameter(ToolParameter::optional(
                "tender",
                ParamType::String,
                "Tender type",
            ));
        assert_eq!(def.parameters.len(), 2);
        assert!(def.parameters[0].required);
        assert!(!def.parameters[1].required);
    }

    #[test]
    fn test_args_typed_accessors() {
        let mut args = ToolArgs::default();
        args.insert("amount", ToolValue::Decimal(dec!(7.00)));
        args.insert("quantity", ToolValue::Int(2));
        args.insert("currency", ToolValue::Text("USD".into()));

        assert_eq!(args.decimal("amount"), Some(dec!(7.00)));
        assert_eq!(args.int("quantity"), Some(2));
        assert_eq!(args.text("currency"), Some("USD"));
        assert_eq!(args.text("amount"), None);
        assert!(!args.contains("ghost"));
    }
}
