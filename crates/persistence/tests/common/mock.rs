//! In-memory connection double.
//!
//! Records every request and answers with scripted responses, falling back
//! to a per-method default once a script runs dry.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use quarry_persistence::config::ConnectorConfig;
use quarry_persistence::connector::{Connection, Connector, IndicesApi, StaticConnector};
use quarry_persistence::error::BackendError;

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub params: Value,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    responses: HashMap<&'static str, VecDeque<Result<Value, BackendError>>>,
    exists: VecDeque<bool>,
    ping_failure: Option<String>,
}

/// Connection double shared between the test and the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response for `method`.
    pub fn respond(&self, method: &'static str, response: Value) -> &Self {
        self.push(method, Ok(response));
        self
    }

    /// Queues a failure for `method`.
    pub fn fail(&self, method: &'static str, error: BackendError) -> &Self {
        self.push(method, Err(error));
        self
    }

    /// Queues a 404 for `method`.
    pub fn not_found(&self, method: &'static str) -> &Self {
        self.fail(
            method,
            BackendError::NotFound {
                resource: format!("mock {}", method),
            },
        )
    }

    /// Queues an answer for `indices.exists`.
    pub fn index_exists(&self, exists: bool) -> &Self {
        self.state.lock().unwrap().exists.push_back(exists);
        self
    }

    pub fn fail_ping(&self, message: &str) {
        self.state.lock().unwrap().ping_failure = Some(message.to_string());
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded calls of one method.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .map(|call| call.params)
            .collect()
    }

    /// Names of the recorded methods, in order.
    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|call| call.method).collect()
    }

    /// Wraps this mock in a connector.
    pub fn connector(&self, config: ConnectorConfig) -> Arc<dyn Connector> {
        Arc::new(StaticConnector::new("default", config, Arc::new(self.clone())))
    }

    fn push(&self, method: &'static str, response: Result<Value, BackendError>) {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry(method)
            .or_default()
            .push_back(response);
    }

    fn record(&self, method: &'static str, params: Value) -> Result<Value, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call { method, params });
        state
            .responses
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(default_response(method)))
    }
}

fn default_response(method: &str) -> Value {
    match method {
        "search" | "search_template" | "scroll" => json!({"hits": {"total": 0, "hits": []}}),
        "mget" => json!({"docs": []}),
        "bulk" => json!({"errors": false, "items": []}),
        "get" => json!({"_id": "", "found": true, "_source": {}}),
        "indices.get_alias" | "indices.get_mapping" | "indices.get_settings" => json!({}),
        _ => json!({"acknowledged": true}),
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn get(&self, params: Value) -> Result<Value, BackendError> {
        self.record("get", params)
    }

    async fn mget(&self, params: Value) -> Result<Value, BackendError> {
        self.record("mget", params)
    }

    async fn search(&self, params: Value) -> Result<Value, BackendError> {
        self.record("search", params)
    }

    async fn search_template(&self, params: Value) -> Result<Value, BackendError> {
        self.record("search_template", params)
    }

    async fn scroll(&self, params: Value) -> Result<Value, BackendError> {
        self.record("scroll", params)
    }

    async fn clear_scroll(&self, params: Value) -> Result<Value, BackendError> {
        self.record("clear_scroll", params)
    }

    async fn index(&self, params: Value) -> Result<Value, BackendError> {
        self.record("index", params)
    }

    async fn delete(&self, params: Value) -> Result<Value, BackendError> {
        self.record("delete", params)
    }

    async fn bulk(&self, params: Value) -> Result<Value, BackendError> {
        self.record("bulk", params)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let state = self.state.lock().unwrap();
        match &state.ping_failure {
            Some(message) => Err(BackendError::ConnectionFailed {
                backend_name: "mock".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn indices(&self) -> &dyn IndicesApi {
        self
    }
}

#[async_trait]
impl IndicesApi for MockConnection {
    async fn exists(&self, params: Value) -> Result<bool, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method: "indices.exists",
            params,
        });
        Ok(state.exists.pop_front().unwrap_or(false))
    }

    async fn create(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.create", params)
    }

    async fn delete(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.delete", params)
    }

    async fn put_mapping(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.put_mapping", params)
    }

    async fn get_mapping(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.get_mapping", params)
    }

    async fn get_settings(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.get_settings", params)
    }

    async fn get_alias(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.get_alias", params)
    }

    async fn update_aliases(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.update_aliases", params)
    }

    async fn put_template(&self, params: Value) -> Result<Value, BackendError> {
        self.record("indices.put_template", params)
    }
}
