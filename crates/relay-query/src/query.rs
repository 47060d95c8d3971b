//! Root query: variables, top-level fields and the round-trip driver.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::accumulator::CursorTables;
use crate::error::QueryError;
use crate::fields::{FieldEntry, FieldTree};
use crate::node::{FieldNode, INDENT, RenderContext};
use crate::transport::Transport;
use crate::variable::{VariableRef, Variables};

/// Default number of edges requested per connection page.
pub const DEFAULT_PAGE_SIZE: u32 = 300;

/// Query execution configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// `first` argument of every connection.
    pub page_size: u32,
    /// Consecutive empty pages tolerated while `hasNextPage` stays true.
    pub max_empty_pages: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_empty_pages: 3,
        }
    }
}

impl QueryConfig {
    /// Set the connection page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set how many consecutive empty pages are tolerated.
    #[must_use]
    pub const fn with_max_empty_pages(mut self, max_empty_pages: u32) -> Self {
        self.max_empty_pages = max_empty_pages;
        self
    }
}

/// A named GraphQL query assembled field by field.
///
/// The query keeps the pagination progress of every field, so one value is
/// driven by one caller at a time:
///
/// ```rust,ignore
/// let mut query = Query::new("FoldersQuery");
/// let project_name = query.add_variable_with_value("projectName", "String!", "demo")?;
/// let project = query.add_field("project");
/// project.set_filter("name", &project_name);
/// let folders = project.add_field_with_edges("folders");
/// folders.add_fields(&FieldTree::from_paths(["id", "name"]));
///
/// let data = query.query(&client).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    name: String,
    config: QueryConfig,
    variables: Variables,
    fields: Vec<FieldNode>,
    rounds: usize,
}

impl Query {
    /// Create a query with the default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, QueryConfig::default())
    }

    /// Create a query with a custom configuration.
    #[must_use]
    pub fn with_config(name: impl Into<String>, config: QueryConfig) -> Self {
        Self {
            name: name.into(),
            config,
            variables: Variables::default(),
            fields: Vec::new(),
            rounds: 0,
        }
    }

    /// Operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution configuration.
    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Round trips performed since the last reset.
    #[must_use]
    pub const fn rounds(&self) -> usize {
        self.rounds
    }

    /// Declare a variable without a value.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Result<VariableRef, QueryError> {
        self.variables.declare(name, value_type, None)
    }

    /// Declare a variable with an initial value.
    pub fn add_variable_with_value(
        &mut self,
        name: impl Into<String>,
        value_type: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<VariableRef, QueryError> {
        self.variables.declare(name, value_type, Some(value.into()))
    }

    /// Set a variable value; `Value::Null` unsets it.
    pub fn set_variable_value(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), QueryError> {
        self.variables.set_value(name, value.into())
    }

    /// Reference to a declared variable.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<VariableRef> {
        self.variables.reference(name)
    }

    /// Current value of a variable.
    #[must_use]
    pub fn variable_value(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).and_then(|variable| variable.value())
    }

    /// Names of all declared variables.
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|variable| variable.name()).collect()
    }

    /// Values sent with each request (unset variables excluded).
    #[must_use]
    pub fn variable_values(&self) -> Map<String, Value> {
        self.variables.values()
    }

    /// Declared variables.
    #[must_use]
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Get or create a plain top-level field.
    pub fn add_field(&mut self, name: &str) -> &mut FieldNode {
        self.field_entry(name, false)
    }

    /// Get or create a top-level connection field.
    pub fn add_field_with_edges(&mut self, name: &str) -> &mut FieldNode {
        self.field_entry(name, true)
    }

    /// Attach a compiled field tree as plain top-level fields.
    pub fn add_fields(&mut self, tree: &FieldTree) {
        for (name, entry) in tree.iter() {
            let field = self.add_field(name);
            if let FieldEntry::Nested(nested) = entry {
                field.add_fields(nested);
            }
        }
    }

    fn field_entry(&mut self, name: &str, has_edges: bool) -> &mut FieldNode {
        if let Some(index) = self.fields.iter().position(|field| field.name() == name) {
            return &mut self.fields[index];
        }
        self.fields.push(FieldNode::new(name, None, has_edges));
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    /// Top-level field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Field by slash separated path, e.g. `project/folders`.
    pub fn field_mut(&mut self, path: &str) -> Option<&mut FieldNode> {
        let mut parts = path.split('/');
        let first = parts.next()?;
        let mut node = self.fields.iter_mut().find(|field| field.name() == first)?;
        for part in parts {
            node = node.child_mut(part)?;
        }
        Some(node)
    }

    /// Top-level fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldNode> {
        self.fields.iter()
    }

    /// Whether any field still needs a round trip.
    #[must_use]
    pub fn needs_query(&self) -> bool {
        self.fields.iter().any(FieldNode::needs_query)
    }

    /// Whether more than one connection field is selected.
    ///
    /// Such queries cannot hand out partial pages: nested or sibling
    /// connections only make sense once merged.
    #[must_use]
    pub fn has_multiple_edge_fields(&self) -> bool {
        let mut count = 0;
        for field in &self.fields {
            count += field.count_connections(2 - count);
            if count > 1 {
                return true;
            }
        }
        false
    }

    /// Render the document for the next round.
    pub fn calculate_query_text(&self) -> Result<String, QueryError> {
        if self.fields.is_empty() {
            return Err(QueryError::MissingFields {
                query: self.name.clone(),
            });
        }

        let header = self.variables.header().unwrap_or_default();
        let mut lines = vec![format!("query {}{header} {{", self.name)];
        let ctx = RenderContext {
            variables: &self.variables,
            page_size: self.config.page_size,
        };
        let any_pending = self.needs_query();
        for field in &self.fields {
            if !any_pending || field.needs_query() {
                field.render(&mut lines, INDENT, ctx)?;
            }
        }
        lines.push("}".to_string());
        Ok(lines.join("\n"))
    }

    /// Run the query to completion and return the merged data.
    ///
    /// Pagination always starts from the first page; a query can be run
    /// again, e.g. after changing variable values.
    pub async fn query<T>(&mut self, transport: &T) -> Result<Value, QueryError>
    where
        T: Transport + ?Sized,
    {
        if self.fields.is_empty() {
            return Err(QueryError::MissingFields {
                query: self.name.clone(),
            });
        }
        self.reset();

        let mut output = Map::new();
        let mut tables = CursorTables::default();
        while self.needs_query() {
            self.round(transport, &mut output, &mut tables).await?;
        }
        self.cleanup_result(&mut tables);
        debug!(query = %self.name, rounds = self.rounds, "query converged");
        Ok(Value::Object(output))
    }

    /// Fetch the next batch of results, `None` once everything was fetched.
    ///
    /// With at most one connection field every call performs one round and
    /// returns only that round's data, plain fields included. Otherwise the
    /// first call runs every round and returns the merged data. Variable
    /// values may be changed between calls.
    pub async fn next_page<T>(&mut self, transport: &T) -> Result<Option<Value>, QueryError>
    where
        T: Transport + ?Sized,
    {
        if self.fields.is_empty() {
            return Err(QueryError::MissingFields {
                query: self.name.clone(),
            });
        }
        if !self.needs_query() {
            return Ok(None);
        }

        let mut output = Map::new();
        let mut tables = CursorTables::default();
        if self.has_multiple_edge_fields() {
            while self.needs_query() {
                self.round(transport, &mut output, &mut tables).await?;
            }
        } else {
            // Each page is returned on its own, so converged plain fields
            // have to be fetched again to appear in it.
            for field in &mut self.fields {
                field.require_plain();
            }
            self.round(transport, &mut output, &mut tables).await?;
        }
        self.cleanup_result(&mut tables);
        Ok(Some(Value::Object(output)))
    }

    /// Forget all pagination progress.
    pub fn reset(&mut self) {
        self.rounds = 0;
        for field in &mut self.fields {
            field.reset();
        }
    }

    async fn round<T>(
        &mut self,
        transport: &T,
        output: &mut Map<String, Value>,
        tables: &mut CursorTables,
    ) -> Result<(), QueryError>
    where
        T: Transport + ?Sized,
    {
        for field in &mut self.fields {
            field.prepare_round();
        }
        let query = self.calculate_query_text()?;
        let variables = self.variables.values();
        self.rounds += 1;
        debug!(
            query = %self.name,
            round = self.rounds,
            variables = variables.len(),
            "sending GraphQL round"
        );
        trace!(query = %self.name, text = %query, "rendered query");

        let response = transport.execute(&query, &variables).await?;
        if !response.errors.is_empty() {
            return Err(QueryError::Graphql {
                errors: response.errors,
                query,
                variables,
            });
        }
        let data = match response.data {
            Some(Value::Object(data)) => data,
            Some(Value::Null) | None => return Err(QueryError::MissingData),
            Some(other) => return Err(QueryError::shape("", "data object", &other)),
        };

        self.parse_result(&data, output, tables)?;
        for field in &mut self.fields {
            field.settle(self.config.max_empty_pages)?;
        }
        Ok(())
    }

    fn parse_result(
        &mut self,
        data: &Map<String, Value>,
        output: &mut Map<String, Value>,
        tables: &mut CursorTables,
    ) -> Result<(), QueryError> {
        for field in self.fields.iter_mut().filter(|field| field.is_requested()) {
            field.parse_result(data, output, tables, "")?;
        }
        Ok(())
    }

    fn cleanup_result(&self, tables: &mut CursorTables) {
        for field in &self.fields {
            field.cleanup_result(tables);
        }
        debug_assert!(tables.is_empty(), "cursor tables left after cleanup");
    }
}
