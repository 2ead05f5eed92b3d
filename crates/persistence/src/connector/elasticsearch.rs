//! Elasticsearch HTTP connector.

use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::Method;
use elasticsearch::http::headers::HeaderMap;
use elasticsearch::http::request::{JsonBody, NdBody};
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use parking_lot::RwLock;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::{Map, Value};

use crate::config::{ConnectorConfig, ElasticsearchAuth};
use crate::error::{BackendError, StorageError, StorageResult};

use super::{Connection, Connector, IndicesApi};

const BACKEND_NAME: &str = "elasticsearch";

/// Parameters addressing the target rather than tuning the request.
const PATH_PARAMETERS: &[&str] = &["index", "type", "id", "name", "body"];

/// Bytes escaped inside a path segment. Commas stay literal as list separators.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Connector building an Elasticsearch client on first use.
pub struct ElasticsearchConnector {
    name: String,
    config: ConnectorConfig,
    connection: RwLock<Option<Arc<ElasticsearchConnection>>>,
}

impl ElasticsearchConnector {
    /// Creates an unconnected connector. The client is built on first use.
    pub fn new(name: impl Into<String>, config: ConnectorConfig) -> Self {
        Self {
            name: name.into(),
            config,
            connection: RwLock::new(None),
        }
    }

    /// Builds the Elasticsearch client from configuration.
    fn build_client(config: &ConnectorConfig) -> StorageResult<Elasticsearch> {
        let url = config
            .nodes
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let parsed_url: elasticsearch::http::Url = url.parse().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Invalid URL: {}", e),
            })
        })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool).timeout(config.request_timeout);

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder.build().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Failed to build transport: {}", e),
            })
        })?;

        Ok(Elasticsearch::new(transport))
    }
}

impl Debug for ElasticsearchConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchConnector")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl Connector for ElasticsearchConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> StorageResult<Arc<dyn Connection>> {
        if let Some(connection) = self.connection.read().as_ref() {
            return Ok(connection.clone() as Arc<dyn Connection>);
        }

        let mut slot = self.connection.write();
        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone() as Arc<dyn Connection>);
        }

        let client = Self::build_client(&self.config)?;
        tracing::debug!(connector = %self.name, nodes = ?self.config.nodes, "Elasticsearch client created");
        let connection = Arc::new(ElasticsearchConnection::new(client));
        *slot = Some(connection.clone());
        Ok(connection as Arc<dyn Connection>)
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

/// [`Connection`] over the Elasticsearch REST API.
///
/// Requests use the typed document layout (`/{index}/{type}/{id}`).
/// Parameters other than `index`, `type`, `id`, `name` and `body` are sent
/// as query-string parameters; list values are joined with commas.
#[derive(Clone)]
pub struct ElasticsearchConnection {
    client: Elasticsearch,
}

impl Debug for ElasticsearchConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchConnection").finish_non_exhaustive()
    }
}

/// A request split into its path, query string and body.
struct Request {
    target: Map<String, Value>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl Request {
    fn from_params(params: Value) -> Self {
        let mut target = Map::new();
        let mut query = Vec::new();
        let mut body = None;

        if let Value::Object(map) = params {
            for (key, value) in map {
                if key == "body" {
                    body = Some(value);
                } else if PATH_PARAMETERS.contains(&key.as_str()) {
                    target.insert(key, value);
                } else if let Some(rendered) = render_parameter(&value) {
                    query.push((key, rendered));
                }
            }
        }

        Self {
            target,
            query,
            body,
        }
    }

    /// Renders a target parameter as a percent-encoded path segment.
    fn segment(&self, key: &str) -> Option<String> {
        self.target
            .get(key)
            .and_then(render_parameter)
            .filter(|s| !s.is_empty())
            .map(|s| utf8_percent_encode(&s, PATH_SEGMENT).to_string())
    }

    /// Builds `/{index}/{type}` followed by `suffix`, skipping absent parts.
    fn path(&self, suffix: &str) -> String {
        let mut path = String::new();
        for key in ["index", "type"] {
            if let Some(segment) = self.segment(key) {
                path.push('/');
                path.push_str(&segment);
            }
        }
        path.push_str(suffix);
        if path.is_empty() { "/".to_string() } else { path }
    }

    fn document_path(&self) -> Result<String, BackendError> {
        let id = self.segment("id").ok_or_else(|| BackendError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message: "document request without id".to_string(),
            source: None,
        })?;
        Ok(self.path(&format!("/{}", id)))
    }
}

/// Renders a parameter value for a path segment or the query string.
fn render_parameter(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render_parameter)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

fn transport_error(e: elasticsearch::Error) -> BackendError {
    BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

impl ElasticsearchConnection {
    /// Wraps an already configured client.
    pub fn new(client: Elasticsearch) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        request: &Request,
        body: Option<JsonBody<Value>>,
    ) -> Result<Response, BackendError> {
        let query = (!request.query.is_empty()).then_some(request.query.as_slice());
        self.client
            .send(method, path, HeaderMap::new(), query, body, None)
            .await
            .map_err(transport_error)
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        request: Request,
    ) -> Result<Value, BackendError> {
        let body = request.body.clone().map(JsonBody::new);
        let response = self.send(method, path, &request, body).await?;
        decode(path, response).await
    }
}

/// Maps non-success statuses to errors and decodes the JSON body.
async fn decode(path: &str, response: Response) -> Result<Value, BackendError> {
    let status = response.status_code();
    if status.as_u16() == 404 {
        return Err(BackendError::NotFound {
            resource: path.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Engine {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await.map_err(transport_error)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| BackendError::SerializationError {
        message: format!("Failed to parse ES response: {}", e),
    })
}

#[async_trait]
impl Connection for ElasticsearchConnection {
    async fn get(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.document_path()?;
        self.send_json(Method::Get, &path, request).await
    }

    async fn mget(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("/_mget");
        self.send_json(Method::Post, &path, request).await
    }

    async fn search(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("/_search");
        self.send_json(Method::Post, &path, request).await
    }

    async fn search_template(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("/_search/template");
        self.send_json(Method::Post, &path, request).await
    }

    async fn scroll(&self, params: Value) -> Result<Value, BackendError> {
        let mut request = Request::from_params(params);
        if request.body.is_none() {
            let mut body = Map::new();
            for (key, value) in request.query.drain(..) {
                body.insert(key, Value::String(value));
            }
            request.body = Some(Value::Object(body));
        }
        self.send_json(Method::Post, "/_search/scroll", request).await
    }

    async fn clear_scroll(&self, params: Value) -> Result<Value, BackendError> {
        let mut request = Request::from_params(params);
        if request.body.is_none() {
            let scroll_ids: Vec<Value> = request
                .query
                .drain(..)
                .filter(|(key, _)| key == "scroll_id")
                .flat_map(|(_, ids)| {
                    ids.split(',')
                        .map(|id| Value::String(id.to_string()))
                        .collect::<Vec<_>>()
                })
                .collect();
            request.body = Some(serde_json::json!({ "scroll_id": scroll_ids }));
        }
        self.send_json(Method::Delete, "/_search/scroll", request).await
    }

    async fn index(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.document_path()?;
        self.send_json(Method::Put, &path, request).await
    }

    async fn delete(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.document_path()?;
        self.send_json(Method::Delete, &path, request).await
    }

    async fn bulk(&self, params: Value) -> Result<Value, BackendError> {
        let mut request = Request::from_params(params);
        let path = request.path("/_bulk");
        let lines: Vec<JsonBody<Value>> = match request.body.take() {
            Some(Value::Array(lines)) => lines.into_iter().map(JsonBody::new).collect(),
            _ => Vec::new(),
        };

        let query = (!request.query.is_empty()).then_some(request.query.as_slice());
        let response = self
            .client
            .send(
                Method::Post,
                &path,
                HeaderMap::new(),
                query,
                Some(NdBody::new(lines)),
                None,
            )
            .await
            .map_err(transport_error)?;
        decode(&path, response).await
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let request = Request::from_params(Value::Null);
        let response = self.send(Method::Head, "/", &request, None).await?;
        let status = response.status_code();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Ping returned status {}", status),
            })
        }
    }

    fn indices(&self) -> &dyn IndicesApi {
        self
    }
}

#[async_trait]
impl IndicesApi for ElasticsearchConnection {
    async fn exists(&self, params: Value) -> Result<bool, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("");
        let response = self.send(Method::Head, &path, &request, None).await?;
        match response.status_code().as_u16() {
            404 => Ok(false),
            status if (200..300).contains(&status) => Ok(true),
            status => Err(BackendError::Engine {
                status,
                body: String::new(),
            }),
        }
    }

    async fn create(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("");
        self.send_json(Method::Put, &path, request).await
    }

    async fn delete(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("");
        self.send_json(Method::Delete, &path, request).await
    }

    async fn put_mapping(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let index = request.segment("index").unwrap_or_default();
        let path = match request.segment("type") {
            Some(doc_type) => format!("/{}/_mapping/{}", index, doc_type),
            None => format!("/{}/_mapping", index),
        };
        self.send_json(Method::Put, &path, request).await
    }

    async fn get_mapping(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("/_mapping");
        self.send_json(Method::Get, &path, request).await
    }

    async fn get_settings(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let path = request.path("/_settings");
        self.send_json(Method::Get, &path, request).await
    }

    async fn get_alias(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let prefix = request
            .segment("index")
            .map(|index| format!("/{}", index))
            .unwrap_or_default();
        let path = match request.segment("name") {
            Some(name) => format!("{}/_alias/{}", prefix, name),
            None => format!("{}/_alias", prefix),
        };
        self.send_json(Method::Get, &path, request).await
    }

    async fn update_aliases(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        self.send_json(Method::Post, "/_aliases", request).await
    }

    async fn put_template(&self, params: Value) -> Result<Value, BackendError> {
        let request = Request::from_params(params);
        let name = request.segment("name").unwrap_or_default();
        let path = format!("/_template/{}", name);
        self.send_json(Method::Put, &path, request).await
    }
}
