//! Per-connection cursor pagination state.
//!
//! Each connection field walks `no-cursor -> mid-pagination -> converged`.
//! A connection only moves its cursor forward once every nested field has
//! converged for the current page; until then the same page is requested
//! again so nested connections can keep paginating under the same edges.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::QueryError;

/// Relay `pageInfo` of one connection occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPageInfo {
    /// Whether there is another page.
    pub has_next_page: bool,
    /// Cursor for the next page.
    pub end_cursor: Option<String>,
}

impl CursorPageInfo {
    /// Read `pageInfo` from a connection object.
    pub(crate) fn from_connection(
        connection: &Map<String, Value>,
        path: &str,
    ) -> Result<Self, QueryError> {
        let page_info = match connection.get("pageInfo") {
            Some(Value::Object(page_info)) => page_info,
            Some(other) => return Err(QueryError::shape(path, "pageInfo object", other)),
            None => return Err(QueryError::shape(path, "pageInfo object", &Value::Null)),
        };
        let has_next_page = match page_info.get("hasNextPage") {
            Some(Value::Bool(value)) => *value,
            Some(other) => return Err(QueryError::shape(path, "hasNextPage boolean", other)),
            None => return Err(QueryError::shape(path, "hasNextPage boolean", &Value::Null)),
        };
        let end_cursor = match page_info.get("endCursor") {
            Some(Value::String(cursor)) => Some(cursor.clone()),
            None | Some(Value::Null) => None,
            Some(other) => return Err(QueryError::shape(path, "endCursor string", other)),
        };
        Ok(Self {
            has_next_page,
            end_cursor,
        })
    }
}

/// What one round reported for a connection, across all its occurrences.
#[derive(Debug, Clone, Default)]
struct RoundPage {
    has_next_page: bool,
    end_cursor: Option<String>,
    edges: usize,
}

/// Pagination state of one field node.
///
/// Plain fields only use `need_query` (true until their first merge).
#[derive(Debug, Clone)]
pub(crate) struct PageState {
    cursor: Option<String>,
    need_query: bool,
    requested: bool,
    empty_pages: u32,
    round: RoundPage,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            cursor: None,
            need_query: true,
            requested: false,
            empty_pages: 0,
            round: RoundPage::default(),
        }
    }
}

impl PageState {
    pub(crate) fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub(crate) const fn need_query(&self) -> bool {
        self.need_query
    }

    pub(crate) const fn requested(&self) -> bool {
        self.requested
    }

    pub(crate) fn mark_converged(&mut self) {
        self.need_query = false;
    }

    /// Ask for the field again without touching the cursor.
    pub(crate) fn require(&mut self) {
        self.need_query = true;
    }

    /// Snapshot whether the node takes part in the upcoming round.
    pub(crate) fn begin_round(&mut self, requested: bool) {
        self.requested = requested;
        self.round = RoundPage::default();
    }

    /// Record one occurrence of the connection in the current response.
    pub(crate) fn record(&mut self, page_info: CursorPageInfo, edges: usize) {
        self.round.edges += edges;
        if page_info.has_next_page {
            self.round.has_next_page = true;
            self.round.end_cursor = page_info.end_cursor;
        }
    }

    /// Close the round for a connection.
    ///
    /// Returns `true` when the cursor moved to the next page, in which case
    /// the caller restarts every nested field.
    pub(crate) fn settle(
        &mut self,
        children_pending: bool,
        max_empty_pages: u32,
        path: &str,
    ) -> Result<bool, QueryError> {
        let round = std::mem::take(&mut self.round);
        self.need_query = round.has_next_page;
        if !round.has_next_page || children_pending {
            return Ok(false);
        }

        if round.edges == 0 {
            self.empty_pages += 1;
            warn!(
                path,
                empty_pages = self.empty_pages,
                "connection reported another page after an empty page"
            );
            if self.empty_pages > max_empty_pages {
                return Err(QueryError::stalled(
                    path,
                    format!("{} consecutive empty pages", self.empty_pages),
                ));
            }
        } else {
            self.empty_pages = 0;
        }

        let Some(next) = round.end_cursor else {
            return Err(QueryError::stalled(path, "hasNextPage without endCursor"));
        };
        if self.cursor.as_deref() == Some(next.as_str()) {
            return Err(QueryError::stalled(
                path,
                format!("endCursor {next:?} did not advance"),
            ));
        }
        debug!(path, cursor = %next, "advancing connection cursor");
        self.cursor = Some(next);
        Ok(true)
    }

    /// Back to `no-cursor`.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
