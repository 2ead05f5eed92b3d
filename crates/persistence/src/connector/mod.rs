//! Engine connections and connectors.
//!
//! A [`Connection`] issues requests against the engine. Every method takes
//! the request parameters as one JSON object (`index`, `type`, `id`, `body`
//! plus engine query-string parameters) and returns the decoded response
//! body. A 404 answer surfaces as [`BackendError::NotFound`].
//!
//! A [`Connector`] owns configuration and hands out connections.

#[cfg(feature = "elasticsearch")]
mod elasticsearch;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::config::{ConnectorConfig, ConnectorState};
use crate::error::{BackendError, StorageResult};

#[cfg(feature = "elasticsearch")]
pub use self::elasticsearch::{ElasticsearchConnection, ElasticsearchConnector};

/// Details message reported after a successful ping.
pub const PING_SUCCEEDED: &str = "Pinging elasticsearch succeeded.";

/// Document, search and scroll requests.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Fetches one document by `index`, `type` and `id`.
    async fn get(&self, params: Value) -> Result<Value, BackendError>;

    /// Fetches several documents in one request.
    async fn mget(&self, params: Value) -> Result<Value, BackendError>;

    /// Runs a search.
    async fn search(&self, params: Value) -> Result<Value, BackendError>;

    /// Runs a stored search template.
    async fn search_template(&self, params: Value) -> Result<Value, BackendError>;

    /// Fetches the next page of an open scroll.
    async fn scroll(&self, params: Value) -> Result<Value, BackendError>;

    /// Releases scroll contexts.
    async fn clear_scroll(&self, params: Value) -> Result<Value, BackendError>;

    /// Indexes one document under `id`.
    async fn index(&self, params: Value) -> Result<Value, BackendError>;

    /// Deletes one document.
    async fn delete(&self, params: Value) -> Result<Value, BackendError>;

    /// Sends `params.body`, a flat list alternating action headers and
    /// documents, in one request.
    async fn bulk(&self, params: Value) -> Result<Value, BackendError>;

    /// Checks that the engine answers.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Index administration requests.
    fn indices(&self) -> &dyn IndicesApi;
}

/// Index administration requests.
#[async_trait]
pub trait IndicesApi: Send + Sync {
    /// Whether the addressed indices exist.
    async fn exists(&self, params: Value) -> Result<bool, BackendError>;

    /// Creates an index with `body` as settings and mappings.
    async fn create(&self, params: Value) -> Result<Value, BackendError>;

    /// Deletes indices.
    async fn delete(&self, params: Value) -> Result<Value, BackendError>;

    /// Puts the mapping of one type.
    async fn put_mapping(&self, params: Value) -> Result<Value, BackendError>;

    /// Returns the mappings of the addressed indices.
    async fn get_mapping(&self, params: Value) -> Result<Value, BackendError>;

    /// Returns the settings of the addressed indices.
    async fn get_settings(&self, params: Value) -> Result<Value, BackendError>;

    /// Returns aliases, optionally filtered by index and alias name.
    async fn get_alias(&self, params: Value) -> Result<Value, BackendError>;

    /// Applies a batch of alias actions.
    async fn update_aliases(&self, params: Value) -> Result<Value, BackendError>;

    /// Stores an index template under `name`.
    async fn put_template(&self, params: Value) -> Result<Value, BackendError>;
}

/// Health report of a connector.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorStatus {
    /// Name of the connector that produced this report.
    pub connection_name: String,
    /// Outcome of the check.
    pub state: ConnectorState,
    /// Backend-specific details, such as the ping message.
    pub details: Map<String, Value>,
}

impl ConnectorStatus {
    /// Creates a status report.
    pub fn new(connection_name: &str, state: ConnectorState, details: Map<String, Value>) -> Self {
        Self {
            connection_name: connection_name.to_string(),
            state,
            details,
        }
    }

    /// True when the connector reported [`ConnectorState::Working`].
    pub fn is_working(&self) -> bool {
        self.state == ConnectorState::Working
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.connection_name, self.state)
    }
}

/// Owns connector configuration and provides connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The name this connector was registered under.
    fn name(&self) -> &str;

    /// Returns the connection, establishing it on first use.
    fn connection(&self) -> StorageResult<Arc<dyn Connection>>;

    /// Connection settings.
    fn config(&self) -> &ConnectorConfig;

    /// Whether a connection has been established.
    fn is_connected(&self) -> bool;

    /// Drops the connection. The next [`Connector::connection`] call
    /// establishes a new one.
    fn disconnect(&self);

    /// Reports whether the engine is reachable.
    ///
    /// Returns the configured `fake_status` without contacting the engine
    /// when one is set.
    async fn status(&self) -> ConnectorStatus {
        if let Some(state) = self.config().fake_status {
            return ConnectorStatus::new(self.name(), state, Map::new());
        }

        let result = match self.connection() {
            Ok(connection) => connection.ping().await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => ConnectorStatus::new(
                self.name(),
                ConnectorState::Working,
                details("message", PING_SUCCEEDED),
            ),
            Err(message) => {
                tracing::warn!(connector = self.name(), error = %message, "Connector status check failed");
                ConnectorStatus::new(self.name(), ConnectorState::Failing, details("error", &message))
            }
        }
    }
}

fn details(key: &str, message: &str) -> Map<String, Value> {
    let mut details = Map::new();
    details.insert(key.to_string(), json!(message));
    details
}

/// A connector over an existing connection.
///
/// Used to share one client between several connectors and to run finders
/// and storage against alternative [`Connection`] implementations.
pub struct StaticConnector {
    name: String,
    config: ConnectorConfig,
    connection: parking_lot::RwLock<Option<Arc<dyn Connection>>>,
    source: Arc<dyn Connection>,
}

impl StaticConnector {
    /// Creates a connector that always hands out `connection`.
    pub fn new(name: impl Into<String>, config: ConnectorConfig, connection: Arc<dyn Connection>) -> Self {
        Self {
            name: name.into(),
            config,
            connection: parking_lot::RwLock::new(None),
            source: connection,
        }
    }
}

impl fmt::Debug for StaticConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticConnector")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for StaticConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> StorageResult<Arc<dyn Connection>> {
        let mut connection = self.connection.write();
        Ok(connection.get_or_insert_with(|| self.source.clone()).clone())
    }

    fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    fn disconnect(&self) {
        self.connection.write().take();
    }
}
