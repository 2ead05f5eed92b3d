//! Elasticsearch finder.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::{FinderConfig, IndexSelection};
use crate::connector::{Connection, Connector};
use crate::error::{BackendError, FinderError, StorageError, StorageResult, ValidationError};
use crate::mapper::ResultMapper;
use crate::merge::merge_layers;

use super::{Finder, FinderResult};

/// Page size of multi-get requests. Results are bounded by the identifier
/// list, not by a query limit.
pub const MGET_SIZE: u64 = 100_000;

/// Sort applied to scrolls: index order, the cheapest order to page through.
pub const SCROLL_SORT: &str = "_doc";

/// Finder over one index/type selection, mapping results with `M`.
pub struct ElasticsearchFinder<M> {
    connector: Arc<dyn Connector>,
    config: FinderConfig,
    mapper: M,
}

impl<M> fmt::Debug for ElasticsearchFinder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchFinder")
            .field("connector", &self.connector.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "elasticsearch".to_string(),
        message,
        source: None,
    })
}

/// Reads `hits.total`, either a plain number or `{ "value": n }`.
pub(crate) fn total_hits(raw: &Value) -> u64 {
    let total = &raw["hits"]["total"];
    total
        .as_u64()
        .or_else(|| total.get("value").and_then(Value::as_u64))
        .unwrap_or(0)
}

fn scroll_id(raw: &Value) -> StorageResult<String> {
    raw.get("_scroll_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| internal_error("scroll response without _scroll_id".to_string()))
}

fn require_object(query: &Value) -> StorageResult<()> {
    if query.is_object() {
        Ok(())
    } else {
        Err(ValidationError::argument("query", "must be a JSON object").into())
    }
}

fn require_cursor(cursor: &str) -> StorageResult<()> {
    if cursor.trim().is_empty() {
        Err(ValidationError::argument("cursor", "must not be blank").into())
    } else {
        Ok(())
    }
}

impl<M: ResultMapper> ElasticsearchFinder<M> {
    /// Creates a finder, validating its configuration.
    pub fn new(
        connector: Arc<dyn Connector>,
        config: FinderConfig,
        mapper: M,
    ) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self {
            connector,
            config,
            mapper,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Returns the mapper applied to raw results.
    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Indices searched: finder config, then connector config, then `_all`.
    pub fn index(&self) -> IndexSelection {
        self.config
            .index
            .clone()
            .or_else(|| self.connector.config().index.clone())
            .filter(|selection| !selection.is_empty())
            .unwrap_or_else(IndexSelection::all)
    }

    /// Types searched: finder config, then connector config, then `_all`.
    pub fn doc_type(&self) -> IndexSelection {
        self.config
            .doc_type
            .clone()
            .or_else(|| self.connector.config().doc_type.clone())
            .filter(|selection| !selection.is_empty())
            .unwrap_or_else(IndexSelection::all)
    }

    fn connection(&self) -> StorageResult<Arc<dyn Connection>> {
        self.connector.connection()
    }

    fn target(&self) -> Value {
        json!({
            "index": self.index().to_value(),
            "type": self.doc_type().to_value()
        })
    }

    fn map_result_data(&self, raw: &Value) -> StorageResult<Vec<M::Item>> {
        if self.config.log_result_data {
            tracing::debug!("Raw result = {}", raw);
        }
        self.mapper.map_result_data(raw)
    }

    /// Rejects selections a single-index API cannot address.
    fn validate_for_single_index_api(
        index: &IndexSelection,
        doc_type: &IndexSelection,
    ) -> StorageResult<()> {
        if index.len() > 1 {
            return Err(FinderError::UnsupportedMultiIndex {
                message: format!(
                    "Elasticsearch single index API does not support multiple indices, \"{}\" given.",
                    index
                ),
            }
            .into());
        }

        if doc_type.len() > 1 && !index.is_all() {
            return Err(FinderError::UnsupportedMultiIndex {
                message: format!(
                    "Elasticsearch multiple type single index API only supports index \"_all\", \"{}\" given.",
                    index
                ),
            }
            .into());
        }

        Ok(())
    }

    fn log_search(&self, operation: &str, query: &Value) {
        if self.config.log_search_query {
            tracing::debug!("{} query = {}", operation, query);
        }
    }
}

#[async_trait]
impl<M: ResultMapper> Finder for ElasticsearchFinder<M> {
    type Item = M::Item;

    async fn get_by_identifier(&self, identifier: &str) -> StorageResult<FinderResult<M::Item>> {
        if identifier.trim().is_empty() {
            return Err(ValidationError::argument("identifier", "must not be blank").into());
        }

        let index = self.index();
        let doc_type = self.doc_type();
        Self::validate_for_single_index_api(&index, &doc_type)?;

        let query = merge_layers([
            self.config.parameters.for_method("get"),
            json!({
                "index": index.to_value(),
                "type": doc_type.to_value(),
                "id": identifier
            }),
        ]);

        if self.config.log_get_query {
            tracing::debug!("Get query = {}", query);
        }

        let items = match self.connection()?.get(query).await {
            Ok(raw) => self.map_result_data(&raw)?,
            Err(BackendError::NotFound { resource }) => {
                tracing::debug!("Document '{}' not found at {}", identifier, resource);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let count = items.len() as u64;
        Ok(FinderResult::new(items, count, 0, None))
    }

    async fn get_by_identifiers(
        &self,
        identifiers: &[String],
    ) -> StorageResult<FinderResult<M::Item>> {
        if identifiers.is_empty() {
            return Err(ValidationError::argument("identifiers", "must not be empty").into());
        }

        let index = self.index();
        let doc_type = self.doc_type();
        Self::validate_for_single_index_api(&index, &doc_type)?;

        let query = merge_layers([
            self.config.parameters.for_method("mget"),
            json!({
                "index": index.to_value(),
                "type": doc_type.to_value(),
                "body": {
                    "ids": identifiers,
                    "size": MGET_SIZE
                }
            }),
        ]);

        if self.config.log_mget_query {
            tracing::debug!("Mget query = {}", query);
        }

        let raw = self.connection()?.mget(query).await?;
        let items = self.map_result_data(&raw)?;

        let count = items.len() as u64;
        Ok(FinderResult::new(items, count, 0, None))
    }

    async fn find(&self, query: Value) -> StorageResult<FinderResult<M::Item>> {
        require_object(&query)?;

        let query = merge_layers([
            self.config.parameters.for_method("search"),
            query,
            self.target(),
        ]);
        self.log_search("Search", &query);

        let offset = query.get("from").and_then(Value::as_u64).unwrap_or(0);
        let raw = self.connection()?.search(query).await?;
        let items = self.map_result_data(&raw)?;

        Ok(FinderResult::new(items, total_hits(&raw), offset, None))
    }

    async fn find_by_stored(&self, query: Value) -> StorageResult<FinderResult<M::Item>> {
        require_object(&query)?;

        let query = merge_layers([
            self.config.parameters.for_method("search"),
            query,
            self.target(),
        ]);
        self.log_search("Stored", &query);

        let offset = query["body"]["params"]["from"].as_u64().unwrap_or(0);
        let raw = self.connection()?.search_template(query).await?;
        let items = self.map_result_data(&raw)?;

        Ok(FinderResult::new(items, total_hits(&raw), offset, None))
    }

    async fn scroll_start(&self, query: Value) -> StorageResult<FinderResult<M::Item>> {
        require_object(&query)?;

        let mut target = self.target();
        target["scroll"] = json!(self.config.scroll_timeout);
        target["sort"] = json!([SCROLL_SORT]);

        let query = merge_layers([self.config.parameters.for_method("search"), query, target]);
        self.log_search("Scroll start", &query);

        let raw = self.connection()?.search(query).await?;
        let items = self.map_result_data(&raw)?;

        Ok(FinderResult::new(items, total_hits(&raw), 0, Some(scroll_id(&raw)?)))
    }

    async fn scroll_next(
        &self,
        cursor: &str,
        _size: Option<u64>,
    ) -> StorageResult<FinderResult<M::Item>> {
        require_cursor(cursor)?;

        let query = json!({
            "scroll_id": cursor,
            "scroll": self.config.scroll_timeout
        });
        self.log_search("Scroll next", &query);

        let raw = self.connection()?.scroll(query).await?;
        let items = self.map_result_data(&raw)?;

        Ok(FinderResult::new(items, total_hits(&raw), 0, Some(scroll_id(&raw)?)))
    }

    async fn scroll_end(&self, cursor: &str) -> StorageResult<()> {
        require_cursor(cursor)?;

        if self.config.log_search_query {
            tracing::debug!("Scroll end {}", cursor);
        }

        match self
            .connection()?
            .clear_scroll(json!({ "scroll_id": cursor }))
            .await
        {
            Ok(_) => Ok(()),
            Err(BackendError::NotFound { .. }) => {
                tracing::debug!("Scroll '{}' already released", cursor);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
