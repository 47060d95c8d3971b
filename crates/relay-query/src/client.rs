//! HTTP transport backed by reqwest.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GraphqlClientError;
use crate::operation::{GraphqlRequest, GraphqlResponse};
use crate::transport::Transport;

/// GraphQL client metrics.
#[derive(Debug, Default)]
#[allow(clippy::struct_field_names)]
pub struct GraphqlClientMetrics {
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_error: AtomicU64,
}

impl GraphqlClientMetrics {
    /// Snapshot current metrics.
    #[must_use]
    pub fn snapshot(&self) -> GraphqlClientMetricsSnapshot {
        GraphqlClientMetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_field_names)]
pub struct GraphqlClientMetricsSnapshot {
    /// Total requests sent.
    pub requests_total: u64,
    /// Requests answered without GraphQL errors.
    pub requests_success: u64,
    /// Requests that failed at the HTTP level or carried GraphQL errors.
    pub requests_error: u64,
}

/// GraphQL client configuration.
#[derive(Debug, Clone)]
pub struct GraphqlClientConfig {
    /// Service name used in logs.
    pub service_name: String,
    /// Default headers applied to every request.
    pub headers: HeaderMap,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for GraphqlClientConfig {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            service_name: "graphql".to_string(),
            headers,
            timeout: Duration::from_secs(30),
        }
    }
}

/// GraphQL client builder.
#[derive(Debug, Clone)]
pub struct GraphqlClientBuilder {
    endpoint: String,
    config: GraphqlClientConfig,
}

impl GraphqlClientBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            config: GraphqlClientConfig::default(),
        }
    }

    /// Set the service name used in logs.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.config.service_name = service_name.into();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.config.headers.insert(name, value);
        self
    }

    /// Add a bearer token header.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        if let Ok(header) = HeaderValue::from_str(&value) {
            self.config.headers.insert(AUTHORIZATION, header);
        }
        self
    }

    /// Set timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GraphqlClient, GraphqlClientError> {
        GraphqlClient::with_config(self.endpoint, self.config)
    }
}

/// GraphQL client posting JSON documents to a single endpoint.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    endpoint: String,
    http: reqwest::Client,
    config: GraphqlClientConfig,
    metrics: Arc<GraphqlClientMetrics>,
}

impl GraphqlClient {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self::with_config(endpoint.clone(), GraphqlClientConfig::default()).unwrap_or_else(|_| {
            Self::new_with_client(endpoint, reqwest::Client::new(), GraphqlClientConfig::default())
        })
    }

    /// Create a client with custom configuration.
    pub fn with_config(
        endpoint: impl Into<String>,
        config: GraphqlClientConfig,
    ) -> Result<Self, GraphqlClientError> {
        let http = reqwest::Client::builder()
            .default_headers(config.headers.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self::new_with_client(endpoint, http, config))
    }

    fn new_with_client(
        endpoint: impl Into<String>,
        http: reqwest::Client,
        config: GraphqlClientConfig,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
            config,
            metrics: Arc::new(GraphqlClientMetrics::default()),
        }
    }

    /// Endpoint the client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Return client metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> GraphqlClientMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Send one request and decode the response envelope.
    ///
    /// GraphQL errors are returned inside the response, not as `Err`.
    pub async fn execute_request(
        &self,
        request: &GraphqlRequest,
    ) -> Result<GraphqlResponse, GraphqlClientError> {
        let body = serde_json::to_vec(request)?;
        self.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
        debug!(
            service = %self.config.service_name,
            operation = request.operation_name.as_deref().unwrap_or(""),
            bytes = body.len(),
            "sending GraphQL request"
        );

        let bytes = self.send_once(body).await?;
        let response: GraphqlResponse = match serde_json::from_slice(&bytes) {
            Ok(response) => response,
            Err(err) => {
                self.metrics.requests_error.fetch_add(1, Ordering::Relaxed);
                return Err(err.into());
            }
        };

        if response.errors.is_empty() {
            self.metrics
                .requests_success
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.requests_error.fetch_add(1, Ordering::Relaxed);
            debug!(
                service = %self.config.service_name,
                errors = response.errors.len(),
                "GraphQL response carried errors"
            );
        }

        Ok(response)
    }

    async fn send_once(&self, body: Vec<u8>) -> Result<Vec<u8>, GraphqlClientError> {
        let response = match self.http.post(&self.endpoint).body(body).send().await {
            Ok(response) => response,
            Err(err) => {
                self.metrics.requests_error.fetch_add(1, Ordering::Relaxed);
                return Err(err.into());
            }
        };

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body = truncate_body(&bytes);
            self.metrics.requests_error.fetch_add(1, Ordering::Relaxed);
            return Err(GraphqlClientError::HttpStatus {
                status,
                body,
                retry_after,
            });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for GraphqlClient {
    async fn execute(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphqlResponse, GraphqlClientError> {
        let request = GraphqlRequest::new(query, variables.clone());
        self.execute_request(&request).await
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate_body(bytes: &[u8]) -> String {
    const MAX_LEN: usize = 4096;
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if body.len() > MAX_LEN {
        let mut end = MAX_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push('…');
    }
    body
}
