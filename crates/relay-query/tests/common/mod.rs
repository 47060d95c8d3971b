//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Mutex, Once};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use relay_query::{GraphqlClientError, GraphqlResponse, Transport};
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing once per test binary.
///
/// Uses `RUST_LOG` when set, otherwise `info,relay_query=debug`.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,relay_query=debug"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer().compact())
            .init();
    });
}

/// Assertion bookkeeping with a structured summary line per test.
pub struct TestContext {
    test_name: String,
    module: String,
    correlation_id: String,
    start_time: Instant,
    assertions_passed: u32,
    assertions_failed: u32,
}

impl TestContext {
    pub fn new(test_name: &str, module: &str) -> Self {
        init_test_tracing();
        Self {
            test_name: test_name.to_string(),
            module: module.to_string(),
            correlation_id: format!("relay-query-{}", std::process::id()),
            start_time: Instant::now(),
            assertions_passed: 0,
            assertions_failed: 0,
        }
    }

    pub fn assert_true(&mut self, condition: bool, msg: &str) {
        if condition {
            self.assertions_passed += 1;
        } else {
            self.assertions_failed += 1;
            panic!("{}", msg);
        }
    }

    pub fn assert_eq<T: std::fmt::Debug + PartialEq>(&mut self, actual: T, expected: T, msg: &str) {
        if actual == expected {
            self.assertions_passed += 1;
        } else {
            self.assertions_failed += 1;
            panic!("{msg}: expected {expected:?}, got {actual:?}");
        }
    }

    pub fn finalize(&self, result: &str, details: Option<Value>) {
        let duration_ms = u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "test_name": self.test_name,
            "module": self.module,
            "phase": "verify",
            "correlation_id": self.correlation_id,
            "result": result,
            "duration_ms": duration_ms,
            "assertions": {
                "passed": self.assertions_passed,
                "failed": self.assertions_failed
            }
        });

        if let Some(extra) = details {
            entry["details"] = extra;
        }

        assert_eq!(self.assertions_failed, 0, "failed assertions in {}", self.test_name);
        info!(target: "relay_query::tests", summary = %entry, "test finished");
    }
}

/// One request seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub query: String,
    pub variables: Map<String, Value>,
}

/// Transport answering from a fixed list of response bodies.
#[derive(Debug)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<GraphqlResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    /// Answer with full response bodies (`data`, `errors`).
    pub fn new(bodies: impl IntoIterator<Item = Value>) -> Self {
        Self::from_responses(
            bodies
                .into_iter()
                .map(|body| serde_json::from_value(body).expect("response body")),
        )
    }

    /// Answer with successful responses carrying `data`.
    pub fn from_data(pages: impl IntoIterator<Item = Value>) -> Self {
        Self::from_responses(pages.into_iter().map(GraphqlResponse::from_data))
    }

    fn from_responses(responses: impl IntoIterator<Item = GraphqlResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().expect("responses lock").len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<GraphqlResponse, GraphqlClientError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                query: query.to_string(),
                variables: variables.clone(),
            });
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| GraphqlClientError::Protocol {
                message: "no scripted response left".to_string(),
            })
    }
}

/// Connection object with plain node items.
pub fn connection(nodes: &[Value], end_cursor: Option<&str>, has_next_page: bool) -> Value {
    let edges: Vec<Value> = nodes
        .iter()
        .map(|node| serde_json::json!({"node": node}))
        .collect();
    serde_json::json!({
        "edges": edges,
        "pageInfo": {"endCursor": end_cursor, "hasNextPage": has_next_page}
    })
}

/// Connection object whose edges carry cursors.
pub fn keyed_connection(
    edges: &[(&str, Value)],
    end_cursor: Option<&str>,
    has_next_page: bool,
) -> Value {
    let edges: Vec<Value> = edges
        .iter()
        .map(|(cursor, node)| serde_json::json!({"cursor": cursor, "node": node}))
        .collect();
    serde_json::json!({
        "edges": edges,
        "pageInfo": {"endCursor": end_cursor, "hasNextPage": has_next_page}
    })
}
