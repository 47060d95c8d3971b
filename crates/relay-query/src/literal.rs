//! GraphQL literal rendering for filter values.

use serde_json::Value;

use crate::error::{QueryError, json_kind};
use crate::variable::{VariableRef, Variables};

/// Value of a field filter (argument).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Inline JSON value. Numbers, strings and lists of those are supported.
    Literal(Value),
    /// Reference to a declared query variable.
    Variable(VariableRef),
    /// List mixing literals and variable references.
    List(Vec<FilterValue>),
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<VariableRef> for FilterValue {
    fn from(variable: VariableRef) -> Self {
        Self::Variable(variable)
    }
}

impl From<&VariableRef> for FilterValue {
    fn from(variable: &VariableRef) -> Self {
        Self::Variable(variable.clone())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl<T: Into<Self>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Render `value` as GraphQL literal text.
///
/// Returns `Ok(None)` when the value references an unset variable (directly
/// or inside a list); the caller drops the whole filter entry.
pub fn render(value: &FilterValue, variables: &Variables) -> Result<Option<String>, QueryError> {
    match value {
        FilterValue::Literal(value) => render_json(value).map(Some),
        FilterValue::Variable(variable) => Ok(variables
            .is_set(variable)?
            .then(|| variable.to_string())),
        FilterValue::List(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                match render(item, variables)? {
                    Some(text) => rendered.push(text),
                    None => return Ok(None),
                }
            }
            Ok(Some(format!("[{}]", rendered.join(", "))))
        }
    }
}

/// Quote a string as a GraphQL string literal.
pub(crate) fn quote(value: &str) -> String {
    // JSON string escaping is a subset of GraphQL's.
    Value::from(value).to_string()
}

fn render_json(value: &Value) -> Result<String, QueryError> {
    match value {
        Value::Number(number) => Ok(number.to_string()),
        Value::String(text) => Ok(quote(text)),
        Value::Array(items) => {
            let rendered = items
                .iter()
                .map(render_json)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", rendered.join(", ")))
        }
        other => Err(QueryError::UnsupportedLiteral {
            kind: json_kind(other),
        }),
    }
}
