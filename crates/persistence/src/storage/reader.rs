//! Document reader.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::config::{ReadSettings, StorageConfig};
use crate::connector::Connector;
use crate::error::{BackendError, StorageResult};
use crate::finder::total_hits;
use crate::mapper::ResultMapper;
use crate::merge::merge_layers;

use super::{StorageTarget, require_identifier};

/// Reads documents of one index/type through a mapper.
///
/// `read_all` keeps the offset of the running iteration, so one reader
/// serves one caller at a time.
pub struct ElasticsearchReader<M> {
    connector: Arc<dyn Connector>,
    config: StorageConfig,
    target: StorageTarget,
    mapper: M,
    offset: u64,
}

impl<M> fmt::Debug for ElasticsearchReader<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchReader")
            .field("connector", &self.connector.name())
            .field("target", &self.target)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl<M: ResultMapper> ElasticsearchReader<M> {
    /// Creates a reader, resolving index and type from `config` or the connector.
    pub fn new(connector: Arc<dyn Connector>, config: StorageConfig, mapper: M) -> StorageResult<Self> {
        config.validate()?;
        let target = StorageTarget::resolve(&config, connector.as_ref())?;
        Ok(Self {
            connector,
            config,
            target,
            mapper,
            offset: 0,
        })
    }

    /// Offset the next continued `read_all` starts from, 0 when the
    /// iteration is exhausted.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads one document, `None` when it does not exist.
    pub async fn read(&self, identifier: &str) -> StorageResult<Option<M::Item>> {
        require_identifier(identifier)?;

        let params = merge_layers([
            self.config.parameters.for_method("get"),
            self.target.document_params(identifier),
        ]);

        match self.connector.connection()?.get(params).await {
            Ok(raw) if raw.get("found").and_then(|f| f.as_bool()) == Some(false) => Ok(None),
            Ok(raw) => self.mapper.map_document(&raw).map(Some),
            Err(BackendError::NotFound { .. }) => {
                tracing::debug!("Document '{}' not found", identifier);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads one page of all documents.
    ///
    /// With `first` set the iteration restarts at the beginning. Otherwise it
    /// continues from the stored offset and yields nothing once exhausted.
    pub async fn read_all(&mut self, settings: ReadSettings) -> StorageResult<Vec<M::Item>> {
        let limit = settings.limit.unwrap_or(self.config.limit);

        let mut params = merge_layers([
            self.config.parameters.for_method("search"),
            self.target.params(),
            json!({
                "size": limit,
                "body": { "query": { "match_all": {} } }
            }),
        ]);

        if settings.first {
            self.offset = 0;
        } else {
            if self.offset == 0 {
                return Ok(Vec::new());
            }
            params["from"] = json!(self.offset);
        }

        let raw = self.connector.connection()?.search(params).await?;
        let items = self.mapper.map_result_data(&raw)?;

        let total = total_hits(&raw);
        let next = self.offset.saturating_add(limit);
        self.offset = if next >= total { 0 } else { next };

        Ok(items)
    }
}
