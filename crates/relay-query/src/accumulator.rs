//! Result accumulator helpers and the cursor lookup side map.
//!
//! The accumulator is the JSON object handed back to the caller. It only
//! ever holds application data: the tables that correlate edges across
//! rounds live in [`CursorTables`], keyed by field path and by the location
//! of the connection list inside the accumulator.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::QueryError;

/// Cursor -> item index tables of connections that contain nested connections.
#[derive(Debug, Default)]
pub(crate) struct CursorTables {
    // field path -> list location -> edge cursor -> index in list
    tables: HashMap<String, HashMap<String, HashMap<String, usize>>>,
}

impl CursorTables {
    /// Index of the item owned by `cursor`, appending a new item on first sight.
    pub(crate) fn slot(
        &mut self,
        field_path: &str,
        location: &str,
        cursor: &str,
        list: &mut Vec<Value>,
    ) -> usize {
        let table = self
            .tables
            .entry(field_path.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default();
        if let Some(index) = table.get(cursor) {
            return *index;
        }
        list.push(Value::Object(Map::new()));
        let index = list.len() - 1;
        table.insert(cursor.to_string(), index);
        index
    }

    /// Drop every table of a field.
    pub(crate) fn release(&mut self, field_path: &str) {
        self.tables.remove(field_path);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Object stored under `key`, created when missing or null.
pub(crate) fn object_entry<'a>(
    output: &'a mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a mut Map<String, Value>, QueryError> {
    let entry = output
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if entry.is_null() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(object) => Ok(object),
        other => Err(QueryError::shape(path, "object", other)),
    }
}

/// List stored under `key`, created when missing or null.
pub(crate) fn list_entry<'a>(
    output: &'a mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a mut Vec<Value>, QueryError> {
    let entry = output
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if entry.is_null() {
        *entry = Value::Array(Vec::new());
    }
    match entry {
        Value::Array(list) => Ok(list),
        other => Err(QueryError::shape(path, "list", other)),
    }
}

/// Object at `index` of an accumulated list.
pub(crate) fn object_at<'a>(
    list: &'a mut [Value],
    index: usize,
    path: &str,
) -> Result<&'a mut Map<String, Value>, QueryError> {
    match list.get_mut(index) {
        Some(Value::Object(object)) => Ok(object),
        Some(other) => Err(QueryError::shape(path, "object", other)),
        None => Err(QueryError::shape(path, "object", &Value::Null)),
    }
}

/// Response value that must be an object.
pub(crate) fn expect_object<'a>(
    value: &'a Value,
    path: &str,
) -> Result<&'a Map<String, Value>, QueryError> {
    value
        .as_object()
        .ok_or_else(|| QueryError::shape(path, "object", value))
}

/// Response value that must be a list.
pub(crate) fn expect_list<'a>(value: Option<&'a Value>, path: &str) -> Result<&'a [Value], QueryError> {
    match value {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(QueryError::shape(path, "list", other)),
        None => Err(QueryError::shape(path, "list", &Value::Null)),
    }
}
