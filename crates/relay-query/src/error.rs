//! Error types for the query engine and its HTTP transport.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// HTTP error information captured from reqwest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorInfo {
    /// Error message.
    pub message: String,
    /// HTTP status code (if available).
    pub status_code: Option<u16>,
    /// Whether the error was a timeout.
    pub is_timeout: bool,
    /// Whether the error was a connection failure.
    pub is_connect: bool,
}

impl From<reqwest::Error> for HttpErrorInfo {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            status_code: err.status().map(|status| status.as_u16()),
            is_timeout: err.is_timeout(),
            is_connect: err.is_connect(),
        }
    }
}

/// GraphQL error location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlErrorLocation {
    /// Line number in the query (1-based).
    pub line: u32,
    /// Column number in the query (1-based).
    pub column: u32,
}

/// GraphQL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphqlPathSegment {
    /// Field name.
    Key(String),
    /// Array index.
    Index(i64),
}

/// GraphQL error (per GraphQL spec).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    /// Human-readable error message.
    pub message: String,
    /// Location(s) within the query.
    #[serde(default)]
    pub locations: Vec<GraphqlErrorLocation>,
    /// Path within the response where the error occurred.
    #[serde(default)]
    pub path: Vec<GraphqlPathSegment>,
    /// Extensions metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Error type for the transport layer.
#[derive(Debug, Clone, Error)]
pub enum GraphqlClientError {
    /// HTTP/network error.
    #[error("HTTP error: {0:?}")]
    Http(HttpErrorInfo),

    /// HTTP response status error.
    #[error("HTTP status {status} with body: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: StatusCode,
        /// Response body (truncated if needed).
        body: String,
        /// Retry-After duration when supplied.
        retry_after: Option<Duration>,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(String),

    /// GraphQL protocol violation.
    #[error("GraphQL protocol error: {message}")]
    Protocol {
        /// Details.
        message: String,
    },
}

impl From<reqwest::Error> for GraphqlClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(HttpErrorInfo::from(err))
    }
}

impl From<serde_json::Error> for GraphqlClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl GraphqlClientError {
    /// Returns `true` if a caller may retry the request.
    ///
    /// The query engine never retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(info) => info.is_timeout || info.is_connect,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Error type for building and executing a paginated query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query has no fields to request.
    #[error("query {query} has no fields to request")]
    MissingFields {
        /// Query name.
        query: String,
    },

    /// A connection field was rendered without a sub-selection.
    #[error("connection {path} has no child fields")]
    EmptyConnection {
        /// Field path.
        path: String,
    },

    /// A variable name was declared twice.
    #[error("variable ${name} was already declared with type {value_type}")]
    DuplicateVariable {
        /// Variable name.
        name: String,
        /// Type of the existing declaration.
        value_type: String,
    },

    /// A variable was referenced but never declared.
    #[error("variable ${name} is not declared")]
    UnknownVariable {
        /// Variable name.
        name: String,
    },

    /// A filter value cannot be written as a GraphQL literal.
    #[error("unsupported literal type: {kind}")]
    UnsupportedLiteral {
        /// JSON kind of the rejected value.
        kind: &'static str,
    },

    /// The server answered with GraphQL errors.
    #[error("GraphQL query failed: {}", first_message(.errors))]
    Graphql {
        /// Errors returned by the server.
        errors: Vec<GraphqlError>,
        /// Query text of the failing round.
        query: String,
        /// Variable values of the failing round.
        variables: Map<String, Value>,
    },

    /// The server answered without a `data` object.
    #[error("GraphQL response is missing data")]
    MissingData,

    /// The response does not have the shape the query asked for.
    #[error("unexpected response shape at {path}: expected {expected}, got {found}")]
    Shape {
        /// Field path.
        path: String,
        /// Expected JSON kind.
        expected: &'static str,
        /// Received JSON kind.
        found: &'static str,
    },

    /// A connection keeps asking for more pages without making progress.
    #[error("pagination stalled at {path}: {reason}")]
    StalledPagination {
        /// Field path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] GraphqlClientError),
}

impl QueryError {
    pub(crate) fn shape(path: &str, expected: &'static str, found: &Value) -> Self {
        Self::Shape {
            path: path.to_string(),
            expected,
            found: json_kind(found),
        }
    }

    pub(crate) fn stalled(path: &str, reason: impl Into<String>) -> Self {
        Self::StalledPagination {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// JSON kind name used in error messages.
pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn first_message(errors: &[GraphqlError]) -> &str {
    errors
        .first()
        .map_or("GraphQL error", |err| err.message.as_str())
}
