//! Relay Query - paginated GraphQL reads assembled from field paths.
//!
//! This crate provides:
//! - Compilation of dotted field paths (`"attrib.fps"`) into a selection tree.
//! - A query tree of plain and Relay connection fields with filters and
//!   declared variables, rendered into GraphQL text.
//! - A round-trip driver that follows `pageInfo` cursors, including
//!   connections nested inside other connections, and merges every page
//!   into one nested JSON result.
//! - A reqwest-backed [`Transport`] implementation.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use relay_query::{FieldTree, GraphqlClientBuilder, Query};
//!
//! let client = GraphqlClientBuilder::new("https://example.com/graphql")
//!     .with_bearer_token(token)
//!     .build()?;
//!
//! let mut query = Query::new("FoldersQuery");
//! let project_name = query.add_variable_with_value("projectName", "String!", "demo")?;
//! let project = query.add_field("project");
//! project.set_filter("name", &project_name);
//! project
//!     .add_field_with_edges("folders")
//!     .add_fields(&FieldTree::from_paths(["id", "name", "attrib.fps"]));
//!
//! let data = query.query(&client).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]

mod accumulator;
mod client;
mod error;
mod fields;
pub mod literal;
mod node;
mod operation;
mod pagination;
mod query;
mod transport;
mod variable;

pub use client::{
    GraphqlClient, GraphqlClientBuilder, GraphqlClientConfig, GraphqlClientMetrics,
    GraphqlClientMetricsSnapshot,
};
pub use error::{
    GraphqlClientError, GraphqlError, GraphqlErrorLocation, GraphqlPathSegment, HttpErrorInfo,
    QueryError,
};
pub use fields::{FieldEntry, FieldTree};
pub use literal::FilterValue;
pub use node::FieldNode;
pub use operation::{GraphqlRequest, GraphqlResponse};
pub use pagination::CursorPageInfo;
pub use query::{DEFAULT_PAGE_SIZE, Query, QueryConfig};
pub use transport::Transport;
pub use variable::{QueryVariable, VariableRef, Variables};
