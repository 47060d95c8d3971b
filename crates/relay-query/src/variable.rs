//! Query variables declared in the operation header.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::QueryError;

/// Reference to a declared variable, usable as a filter value.
///
/// Renders as `$name` while the variable has a value. A filter holding a
/// reference to an unset variable is dropped from the query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    name: String,
}

impl VariableRef {
    /// Name of the variable without the `$` sigil.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

/// One declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVariable {
    name: String,
    value_type: String,
    value: Option<Value>,
}

impl QueryVariable {
    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// GraphQL type, e.g. `[String!]`.
    #[must_use]
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    /// Current value, `None` when unset.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// Ordered set of variables owned by a query.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    items: Vec<QueryVariable>,
}

impl Variables {
    /// Declare a variable. Names are unique within a query.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        value_type: impl Into<String>,
        value: Option<Value>,
    ) -> Result<VariableRef, QueryError> {
        let name = name.into();
        if let Some(existing) = self.get(&name) {
            return Err(QueryError::DuplicateVariable {
                name,
                value_type: existing.value_type.clone(),
            });
        }
        self.items.push(QueryVariable {
            name: name.clone(),
            value_type: value_type.into(),
            value: value.filter(|value| !value.is_null()),
        });
        Ok(VariableRef { name })
    }

    /// Look up a declared variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&QueryVariable> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Reference to a declared variable.
    #[must_use]
    pub fn reference(&self, name: &str) -> Option<VariableRef> {
        self.get(name).map(|item| VariableRef {
            name: item.name.clone(),
        })
    }

    /// Set the value of a declared variable. `Value::Null` unsets it.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), QueryError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.name == name)
            .ok_or_else(|| QueryError::UnknownVariable {
                name: name.to_string(),
            })?;
        item.value = if value.is_null() { None } else { Some(value) };
        Ok(())
    }

    /// Whether the referenced variable currently has a value.
    pub(crate) fn is_set(&self, variable: &VariableRef) -> Result<bool, QueryError> {
        self.get(&variable.name)
            .map(|item| item.value.is_some())
            .ok_or_else(|| QueryError::UnknownVariable {
                name: variable.name.clone(),
            })
    }

    /// Header declarations for every variable with a value.
    pub(crate) fn header(&self) -> Option<String> {
        let declared: Vec<String> = self
            .items
            .iter()
            .filter(|item| item.value.is_some())
            .map(|item| format!("${}: {}", item.name, item.value_type))
            .collect();
        if declared.is_empty() {
            None
        } else {
            Some(format!("({})", declared.join(", ")))
        }
    }

    /// Values sent alongside the query text.
    #[must_use]
    pub fn values(&self) -> Map<String, Value> {
        self.items
            .iter()
            .filter_map(|item| {
                item.value
                    .as_ref()
                    .map(|value| (item.name.clone(), value.clone()))
            })
            .collect()
    }

    /// Iterate declared variables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &QueryVariable> {
        self.items.iter()
    }

    /// Number of declared variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no variable is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
