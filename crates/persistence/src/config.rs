//! Configuration for connectors, finders, translators and storage.
//!
//! Every component receives its configuration once, at construction, and
//! never mutates it afterwards. All structs deserialize with `serde` so they
//! can be embedded in whatever settings format the application loads.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{StorageResult, ValidationError};

/// Index or type name used when nothing is configured.
pub const ALL: &str = "_all";

/// A list of index or type names.
///
/// Deserializes from either a comma-separated string (`"books,authors"`) or
/// a list of strings. Blank segments are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSelection(Vec<String>);

impl IndexSelection {
    /// Creates a selection from a comma-separated list of names.
    pub fn parse(names: &str) -> Self {
        Self::from_names(names.split(','))
    }

    /// Creates a selection from individual names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|name| name.as_ref().trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    /// The `_all` selection.
    pub fn all() -> Self {
        Self(vec![ALL.to_string()])
    }

    /// Returns the selected names.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Returns true if no name is selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of selected names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if this is exactly the `_all` selection.
    pub fn is_all(&self) -> bool {
        self.0.len() == 1 && self.0[0] == ALL
    }

    /// Returns the names as a JSON array, the form used in request parameters.
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

impl fmt::Display for IndexSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl From<&str> for IndexSelection {
    fn from(names: &str) -> Self {
        Self::parse(names)
    }
}

impl From<Vec<String>> for IndexSelection {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl Serialize for IndexSelection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IndexSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Joined(String),
            List(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Joined(names) => Self::parse(&names),
            Raw::List(names) => Self::from_names(names),
        })
    }
}

/// Engine parameters keyed by connection method (`get`, `search`, `index`, ...).
///
/// The parameters for a method are merged into every request issued through
/// that method, e.g. `{"index": {"refresh": "wait_for"}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodParameters(HashMap<String, Map<String, Value>>);

impl MethodParameters {
    /// Sets the parameters for one method.
    pub fn with(mut self, method: &str, parameters: Value) -> Self {
        if let Value::Object(map) = parameters {
            self.0.insert(method.to_string(), map);
        }
        self
    }

    /// Returns the parameters configured for `method`, or an empty object.
    pub fn for_method(&self, method: &str) -> Value {
        Value::Object(self.0.get(method).cloned().unwrap_or_default())
    }
}

/// Authentication configuration for Elasticsearch.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

impl fmt::Debug for ElasticsearchAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElasticsearchAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            ElasticsearchAuth::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
        }
    }
}

/// Connector health as reported by [`crate::connector::Connector::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorState {
    /// The engine answered.
    Working,
    /// The engine could not be reached or answered with an error.
    Failing,
    /// No check has been performed.
    Unknown,
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorState::Working => "working",
            ConnectorState::Failing => "failing",
            ConnectorState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Configuration for an Elasticsearch connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Request timeout (default: 30s).
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,

    /// Index used by finders and storage that do not name one.
    #[serde(default)]
    pub index: Option<IndexSelection>,

    /// Document type used by finders and storage that do not name one.
    #[serde(default, rename = "type")]
    pub doc_type: Option<IndexSelection>,

    /// Reported by `status()` instead of pinging the engine.
    #[serde(default)]
    pub fake_status: Option<ConnectorState>,
}

fn default_nodes() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            request_timeout: default_request_timeout(),
            auth: None,
            disable_certificate_validation: false,
            index: None,
            doc_type: None,
            fake_status: None,
        }
    }
}

/// Configuration for the search access layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Indices to search, falls back to the connector's index, then `_all`.
    #[serde(default)]
    pub index: Option<IndexSelection>,

    /// Types to search, falls back to the connector's type, then `_all`.
    #[serde(default, rename = "type")]
    pub doc_type: Option<IndexSelection>,

    /// Per-method engine parameters (`get`, `mget`, `search`).
    #[serde(default)]
    pub parameters: MethodParameters,

    /// Logs each `get` request at debug level.
    #[serde(default)]
    pub log_get_query: bool,

    /// Logs each `mget` request at debug level.
    #[serde(default)]
    pub log_mget_query: bool,

    /// Logs each `search` request at debug level.
    #[serde(default)]
    pub log_search_query: bool,

    /// Logs raw engine responses at debug level.
    #[serde(default)]
    pub log_result_data: bool,

    /// Scroll keep-alive passed to the engine verbatim (default: `1m`).
    #[serde(default = "default_scroll_timeout")]
    pub scroll_timeout: String,
}

fn default_scroll_timeout() -> String {
    "1m".to_string()
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            index: None,
            doc_type: None,
            parameters: MethodParameters::default(),
            log_get_query: false,
            log_mget_query: false,
            log_search_query: false,
            log_result_data: false,
            scroll_timeout: default_scroll_timeout(),
        }
    }
}

impl FinderConfig {
    /// Checks values that serde cannot check on its own.
    pub fn validate(&self) -> StorageResult<()> {
        humantime::parse_duration(&self.scroll_timeout).map_err(|e| {
            ValidationError::InvalidConfig {
                key: "scroll_timeout".to_string(),
                message: e.to_string(),
            }
        })?;
        validate_selection("index", self.index.as_ref())?;
        validate_selection("type", self.doc_type.as_ref())?;
        Ok(())
    }
}

/// Configuration for criteria query translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Equality filters appended to every query, attribute path to value,
    /// in configuration order.
    #[serde(default)]
    pub query_filters: Map<String, Value>,

    /// Attributes mapped with `.filter` and `.sort` sub-fields.
    #[serde(default)]
    pub multi_fields: Vec<String>,

    /// `unmapped_type` hints for sorting, merged over the built-in table.
    #[serde(default)]
    pub dynamic_mappings: BTreeMap<String, String>,

    /// Extra settings for full-text match queries (e.g. `fuzziness`).
    #[serde(default)]
    pub search_query_settings: Map<String, Value>,

    /// Pattern detecting suggestion phrases. Capture 1 is the attribute
    /// path, capture 2 the term.
    #[serde(default = "default_suggest_pattern")]
    pub suggest_pattern: String,
}

/// Default pattern for `suggest:<path>=<term>` phrases.
pub const SUGGEST_PATTERN: &str = r"^suggest:([\.\w]+)=(.+)";

fn default_suggest_pattern() -> String {
    SUGGEST_PATTERN.to_string()
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            query_filters: Map::new(),
            multi_fields: Vec::new(),
            dynamic_mappings: BTreeMap::new(),
            search_query_settings: Map::new(),
            suggest_pattern: default_suggest_pattern(),
        }
    }
}

impl TranslationConfig {
    pub(crate) fn is_multi_field(&self, attribute_path: &str) -> bool {
        self.multi_fields.iter().any(|field| field == attribute_path)
    }
}

/// How stored queries are referenced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredQueryMethod {
    /// A template registered on the engine by id.
    #[default]
    Id,
    /// A template file on the engine's nodes.
    File,
}

impl StoredQueryMethod {
    /// Returns the request body key selecting the template.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredQueryMethod::Id => "id",
            StoredQueryMethod::File => "file",
        }
    }
}

/// Configuration for stored query translation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredQueryConfig {
    /// How stored queries are sent to the engine.
    #[serde(default)]
    pub method: StoredQueryMethod,
}

/// Default page size for `read_all`.
pub const READ_ALL_LIMIT: u64 = 10;

/// Configuration for storage writers and readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Target index, falls back to the connector's index.
    #[serde(default)]
    pub index: Option<IndexSelection>,

    /// Target type, falls back to the connector's type.
    #[serde(default, rename = "type")]
    pub doc_type: Option<IndexSelection>,

    /// Per-method engine parameters (`index`, `bulk`, `delete`).
    #[serde(default)]
    pub parameters: MethodParameters,

    /// Page size for `read_all` (default: 10).
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    READ_ALL_LIMIT
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index: None,
            doc_type: None,
            parameters: MethodParameters::default(),
            limit: default_limit(),
        }
    }
}

impl StorageConfig {
    /// Checks values that serde cannot check on its own.
    pub fn validate(&self) -> StorageResult<()> {
        if self.limit == 0 {
            return Err(ValidationError::InvalidConfig {
                key: "limit".to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into());
        }
        validate_selection("index", self.index.as_ref())?;
        validate_selection("type", self.doc_type.as_ref())?;
        Ok(())
    }
}

/// Per-call settings for `read_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSettings {
    /// Overrides the configured page size.
    pub limit: Option<u64>,
    /// Starts a new iteration when true, continues the current one otherwise.
    pub first: bool,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            limit: None,
            first: true,
        }
    }
}

impl ReadSettings {
    /// Settings continuing the current iteration.
    pub fn next() -> Self {
        Self {
            limit: None,
            first: false,
        }
    }
}

fn validate_selection(key: &str, selection: Option<&IndexSelection>) -> StorageResult<()> {
    match selection {
        Some(selection) if selection.is_empty() => Err(ValidationError::InvalidConfig {
            key: key.to_string(),
            message: "must name at least one entry".to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Writes the duration as a humantime string such as `30s`.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Parses a humantime string such as `1m 30s`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
