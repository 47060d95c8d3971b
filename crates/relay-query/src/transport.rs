//! Transport seam between the query engine and the server session.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::GraphqlClientError;
use crate::operation::GraphqlResponse;

/// Executes one rendered GraphQL document.
///
/// The engine awaits each call before rendering the next round, so
/// implementations never see overlapping requests from one query.
/// Timeouts, authentication and retries belong here, not in the engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `query` with `variables` and return the decoded response.
    async fn execute(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphqlResponse, GraphqlClientError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphqlResponse, GraphqlClientError> {
        (**self).execute(query, variables).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphqlResponse, GraphqlClientError> {
        (**self).execute(query, variables).await
    }
}
