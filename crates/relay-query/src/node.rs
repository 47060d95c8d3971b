//! Field nodes of a query tree.

use serde_json::{Map, Value};

use crate::accumulator::{self, CursorTables};
use crate::error::QueryError;
use crate::fields::{FieldEntry, FieldTree};
use crate::literal::{self, FilterValue};
use crate::pagination::{CursorPageInfo, PageState};
use crate::variable::Variables;

/// Spaces added per nesting level of the rendered document.
pub(crate) const INDENT: usize = 2;

/// Everything a node needs to render its selection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderContext<'a> {
    pub(crate) variables: &'a Variables,
    pub(crate) page_size: u32,
}

/// One selected field.
///
/// A plain field renders as `name(filters) { children }`. A connection
/// field (`has_edges`) wraps its children in the Relay
/// `edges { node { ... } } pageInfo { ... }` envelope and is paginated with
/// `first`/`after`.
#[derive(Debug, Clone)]
pub struct FieldNode {
    name: String,
    path: String,
    has_edges: bool,
    filters: Vec<(String, FilterValue)>,
    children: Vec<FieldNode>,
    edge_children: Vec<FieldNode>,
    page: PageState,
}

impl FieldNode {
    pub(crate) fn new(name: impl Into<String>, parent_path: Option<&str>, has_edges: bool) -> Self {
        let name = name.into();
        let path = match parent_path {
            Some(parent) => format!("{parent}/{name}"),
            None => name.clone(),
        };
        Self {
            name,
            path,
            has_edges,
            filters: Vec::new(),
            children: Vec::new(),
            edge_children: Vec::new(),
            page: PageState::default(),
        }
    }

    /// Field name as sent to the server.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slash separated path from the query root, e.g. `project/folders`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether this is a paginated connection field.
    #[must_use]
    pub const fn has_edges(&self) -> bool {
        self.has_edges
    }

    /// Cursor the next request starts after, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.page.cursor()
    }

    /// Get or create a plain child field.
    pub fn add_field(&mut self, name: &str) -> &mut Self {
        self.child_entry(name, false, false)
    }

    /// Get or create a connection child field.
    pub fn add_field_with_edges(&mut self, name: &str) -> &mut Self {
        self.child_entry(name, true, false)
    }

    /// Get or create a field read from the edge object instead of its node.
    ///
    /// On a plain field this is the same as [`add_field`](Self::add_field).
    pub fn add_edge_field(&mut self, name: &str) -> &mut Self {
        let on_edge = self.has_edges;
        self.child_entry(name, false, on_edge)
    }

    /// Attach every path of a compiled field tree as plain fields.
    pub fn add_fields(&mut self, tree: &FieldTree) {
        for (name, entry) in tree.iter() {
            let child = self.add_field(name);
            if let FieldEntry::Nested(nested) = entry {
                child.add_fields(nested);
            }
        }
    }

    fn child_entry(&mut self, name: &str, has_edges: bool, on_edge: bool) -> &mut Self {
        if let Some(index) = self.children.iter().position(|child| child.name == name) {
            return &mut self.children[index];
        }
        if let Some(index) = self.edge_children.iter().position(|child| child.name == name) {
            return &mut self.edge_children[index];
        }
        let child = Self::new(name, Some(&self.path), has_edges);
        let list = if on_edge {
            &mut self.edge_children
        } else {
            &mut self.children
        };
        list.push(child);
        let last = list.len() - 1;
        &mut list[last]
    }

    /// Direct child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.all_children().find(|child| child.name == name)
    }

    /// Direct child by name, mutably.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.children
            .iter_mut()
            .chain(self.edge_children.iter_mut())
            .find(|child| child.name == name)
    }

    /// Node children followed by edge children.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.all_children()
    }

    fn all_children(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().chain(self.edge_children.iter())
    }

    fn all_children_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.children.iter_mut().chain(self.edge_children.iter_mut())
    }

    /// Set (or replace) a filter argument.
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.filters.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.filters.push((key, value)),
        }
        self
    }

    /// Whether a filter is set for `key`.
    #[must_use]
    pub fn has_filter(&self, key: &str) -> bool {
        self.filters.iter().any(|(existing, _)| existing == key)
    }

    /// Remove a filter, returning its value.
    pub fn remove_filter(&mut self, key: &str) -> Option<FilterValue> {
        let index = self.filters.iter().position(|(existing, _)| existing == key)?;
        Some(self.filters.remove(index).1)
    }

    /// Whether this node or any descendant still needs a round trip.
    #[must_use]
    pub fn needs_query(&self) -> bool {
        self.page.need_query() || self.all_children().any(Self::needs_query)
    }

    /// Whether any descendant is a connection.
    #[must_use]
    pub fn child_has_edges(&self) -> bool {
        self.all_children()
            .any(|child| child.has_edges || child.child_has_edges())
    }

    /// Number of connection fields in this subtree, counting stops at `limit`.
    pub(crate) fn count_connections(&self, limit: usize) -> usize {
        let mut count = usize::from(self.has_edges);
        for child in self.all_children() {
            if count >= limit {
                break;
            }
            count += child.count_connections(limit - count);
        }
        count
    }

    /// Render this node's selection at `indent` spaces.
    ///
    /// Fields that already converged are left out while a sibling still
    /// paginates; before the first round every field is rendered.
    pub fn calculate_query_text(
        &self,
        indent: usize,
        variables: &Variables,
        page_size: u32,
    ) -> Result<String, QueryError> {
        let mut lines = Vec::new();
        self.render(
            &mut lines,
            indent,
            RenderContext {
                variables,
                page_size,
            },
        )?;
        Ok(lines.join("\n"))
    }

    pub(crate) fn render(
        &self,
        lines: &mut Vec<String>,
        indent: usize,
        ctx: RenderContext<'_>,
    ) -> Result<(), QueryError> {
        let pad = " ".repeat(indent);
        let header = format!("{pad}{}{}", self.name, self.filters_text(ctx)?);

        if !self.has_edges {
            if self.children.is_empty() {
                lines.push(header);
                return Ok(());
            }
            lines.push(format!("{header} {{"));
            for child in selected(&self.children) {
                child.render(lines, indent + INDENT, ctx)?;
            }
            lines.push(format!("{pad}}}"));
            return Ok(());
        }

        if self.children.is_empty() && self.edge_children.is_empty() {
            return Err(QueryError::EmptyConnection {
                path: self.path.clone(),
            });
        }

        let edges_pad = " ".repeat(indent + INDENT);
        let node_indent = indent + 2 * INDENT;
        let node_pad = " ".repeat(node_indent);

        lines.push(format!("{header} {{"));
        lines.push(format!("{edges_pad}edges {{"));
        for child in selected(&self.edge_children) {
            child.render(lines, node_indent, ctx)?;
        }
        if !self.children.is_empty() {
            lines.push(format!("{node_pad}node {{"));
            for child in selected(&self.children) {
                child.render(lines, node_indent + INDENT, ctx)?;
            }
            lines.push(format!("{node_pad}}}"));
        }
        if self.child_has_edges() {
            lines.push(format!("{node_pad}cursor"));
        }
        lines.push(format!("{edges_pad}}}"));
        lines.push(format!("{edges_pad}pageInfo {{"));
        lines.push(format!("{node_pad}endCursor"));
        lines.push(format!("{node_pad}hasNextPage"));
        lines.push(format!("{edges_pad}}}"));
        lines.push(format!("{pad}}}"));
        Ok(())
    }

    fn filters_text(&self, ctx: RenderContext<'_>) -> Result<String, QueryError> {
        let mut items = Vec::with_capacity(self.filters.len() + 2);
        for (key, value) in &self.filters {
            if self.has_edges && (key == "first" || key == "after") {
                continue;
            }
            if let Some(text) = literal::render(value, ctx.variables)? {
                items.push(format!("{key}: {text}"));
            }
        }
        if self.has_edges {
            items.push(format!("first: {}", ctx.page_size));
            if let Some(cursor) = self.page.cursor() {
                items.push(format!("after: {}", literal::quote(cursor)));
            }
        }
        if items.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("({})", items.join(", ")))
        }
    }

    /// Whether the node takes part in the current round.
    pub(crate) const fn is_requested(&self) -> bool {
        self.page.requested()
    }

    /// Snapshot which nodes take part in the upcoming round.
    pub(crate) fn prepare_round(&mut self) {
        let requested = self.needs_query();
        self.page.begin_round(requested);
        for child in self.all_children_mut() {
            child.prepare_round();
        }
    }

    /// Merge this node's slice of `data` into `output`.
    ///
    /// `location` is the position of `output` inside the accumulator and
    /// scopes the cursor tables of nested connections.
    pub(crate) fn parse_result(
        &mut self,
        data: &Map<String, Value>,
        output: &mut Map<String, Value>,
        tables: &mut CursorTables,
        location: &str,
    ) -> Result<(), QueryError> {
        if self.has_edges {
            self.parse_connection(data, output, tables, location)
        } else {
            self.parse_plain(data, output, tables, location)
        }
    }

    fn parse_plain(
        &mut self,
        data: &Map<String, Value>,
        output: &mut Map<String, Value>,
        tables: &mut CursorTables,
        location: &str,
    ) -> Result<(), QueryError> {
        self.page.mark_converged();
        let value = match data.get(&self.name) {
            None => {
                self.skip_children();
                return Ok(());
            }
            Some(Value::Null) => {
                output.entry(self.name.clone()).or_insert(Value::Null);
                self.skip_children();
                return Ok(());
            }
            Some(value) => value,
        };

        if self.children.is_empty() {
            output.insert(self.name.clone(), value.clone());
            return Ok(());
        }

        let location = format!("{location}/{}", self.name);
        match value {
            Value::Object(object) => {
                let slot = accumulator::object_entry(output, &self.name, &self.path)?;
                for child in self.children.iter_mut().filter(|child| child.page.requested()) {
                    child.parse_result(object, slot, tables, &location)?;
                }
            }
            Value::Array(items) => {
                let list = accumulator::list_entry(output, &self.name, &self.path)?;
                if items.is_empty() {
                    self.skip_children();
                    return Ok(());
                }
                if list.len() < items.len() {
                    list.resize_with(items.len(), || Value::Object(Map::new()));
                }
                for (index, item) in items.iter().enumerate() {
                    let item = accumulator::expect_object(item, &self.path)?;
                    let slot = accumulator::object_at(list, index, &self.path)?;
                    let item_location = format!("{location}/{index}");
                    for child in self.children.iter_mut().filter(|child| child.page.requested()) {
                        child.parse_result(item, slot, tables, &item_location)?;
                    }
                }
            }
            other => return Err(QueryError::shape(&self.path, "object or list", other)),
        }
        Ok(())
    }

    fn parse_connection(
        &mut self,
        data: &Map<String, Value>,
        output: &mut Map<String, Value>,
        tables: &mut CursorTables,
        location: &str,
    ) -> Result<(), QueryError> {
        let connection = match data.get(&self.name) {
            None | Some(Value::Null) => {
                self.skip_children();
                return Ok(());
            }
            Some(value) => accumulator::expect_object(value, &self.path)?,
        };

        let page_info = CursorPageInfo::from_connection(connection, &self.path)?;
        let edges = accumulator::expect_list(connection.get("edges"), &self.path)?;
        self.page.record(page_info, edges.len());

        let list = accumulator::list_entry(output, &self.name, &self.path)?;
        if edges.is_empty() {
            self.skip_children();
            return Ok(());
        }

        let keyed = self.child_has_edges();
        let parse_node = self.children.iter().any(|child| child.page.requested());
        let list_location = format!("{location}/{}", self.name);
        for edge in edges {
            let edge = accumulator::expect_object(edge, &self.path)?;
            let index = if keyed {
                let cursor = match edge.get("cursor") {
                    Some(Value::String(cursor)) => cursor,
                    Some(other) => return Err(QueryError::shape(&self.path, "edge cursor", other)),
                    None => {
                        return Err(QueryError::shape(&self.path, "edge cursor", &Value::Null));
                    }
                };
                tables.slot(&self.path, &list_location, cursor, list)
            } else {
                list.push(Value::Object(Map::new()));
                list.len() - 1
            };
            let slot = accumulator::object_at(list, index, &self.path)?;
            let item_location = format!("{list_location}/{index}");

            for child in self
                .edge_children
                .iter_mut()
                .filter(|child| child.page.requested())
            {
                child.parse_result(edge, slot, tables, &item_location)?;
            }
            if parse_node {
                let node = match edge.get("node") {
                    Some(node) => accumulator::expect_object(node, &self.path)?,
                    None => return Err(QueryError::shape(&self.path, "edge node", &Value::Null)),
                };
                for child in self.children.iter_mut().filter(|child| child.page.requested()) {
                    child.parse_result(node, slot, tables, &item_location)?;
                }
            }
        }
        Ok(())
    }

    /// Mark the subtree as converged for a response that has no data for it.
    fn skip_children(&mut self) {
        for child in self.all_children_mut() {
            if !child.has_edges {
                child.page.mark_converged();
            }
            child.skip_children();
        }
    }

    /// Update pagination state once the whole response has been merged.
    pub(crate) fn settle(&mut self, max_empty_pages: u32) -> Result<(), QueryError> {
        if !self.page.requested() {
            return Ok(());
        }
        for child in self.all_children_mut() {
            child.settle(max_empty_pages)?;
        }
        if !self.has_edges {
            // Plain fields never paginate on their own.
            self.page.mark_converged();
            return Ok(());
        }

        let children_pending = self.all_children().any(Self::needs_query);
        if self
            .page
            .settle(children_pending, max_empty_pages, &self.path)?
        {
            for child in self.all_children_mut() {
                child.reset();
            }
        }
        Ok(())
    }

    /// Drop transient cursor tables of this subtree.
    pub(crate) fn cleanup_result(&self, tables: &mut CursorTables) {
        if self.has_edges && self.child_has_edges() {
            tables.release(&self.path);
        }
        for child in self.all_children() {
            child.cleanup_result(tables);
        }
    }

    /// Request converged plain fields again, leaving connections alone.
    pub(crate) fn require_plain(&mut self) {
        if self.has_edges {
            return;
        }
        self.page.require();
        for child in self.all_children_mut() {
            child.require_plain();
        }
    }

    /// Return the subtree to its initial state.
    pub(crate) fn reset(&mut self) {
        self.page.reset();
        for child in self.all_children_mut() {
            child.reset();
        }
    }
}

/// Children taking part in the next round, or all of them when none does.
fn selected(children: &[FieldNode]) -> impl Iterator<Item = &FieldNode> {
    let any_pending = children.iter().any(FieldNode::needs_query);
    children
        .iter()
        .filter(move |child| !any_pending || child.needs_query())
}
