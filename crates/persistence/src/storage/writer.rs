//! Document writer.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::config::StorageConfig;
use crate::connector::Connector;
use crate::error::{BackendError, StorageResult};
use crate::merge::merge_layers;

use super::{Document, StorageTarget, require_identifier};

/// Writes documents of type `D` to one index/type.
pub struct ElasticsearchWriter<D> {
    connector: Arc<dyn Connector>,
    config: StorageConfig,
    target: StorageTarget,
    _document: PhantomData<fn(&D)>,
}

impl<D> fmt::Debug for ElasticsearchWriter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchWriter")
            .field("connector", &self.connector.name())
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<D: Document> ElasticsearchWriter<D> {
    /// Creates a writer, resolving index and type from `config` or the connector.
    pub fn new(connector: Arc<dyn Connector>, config: StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let target = StorageTarget::resolve(&config, connector.as_ref())?;
        Ok(Self {
            connector,
            config,
            target,
            _document: PhantomData,
        })
    }

    /// Indexes one document under its identifier.
    pub async fn write(&self, document: &D) -> StorageResult<()> {
        let identifier = document.identifier();
        require_identifier(identifier)?;

        let mut request = self.target.document_params(identifier);
        request["body"] = document.to_document()?;
        let params = merge_layers([self.config.parameters.for_method("index"), request]);

        self.connector.connection()?.index(params).await?;
        tracing::debug!(
            "Indexed document '{}' into {}/{}",
            identifier,
            self.target.index,
            self.target.doc_type
        );
        Ok(())
    }

    /// Writes a batch. One document goes through [`Self::write`], more are
    /// sent as a single bulk request in iteration order. Nothing is sent when
    /// any document has a blank identifier.
    pub async fn write_many(&self, documents: &[D]) -> StorageResult<()> {
        match documents {
            [] => Ok(()),
            [document] => self.write(document).await,
            _ => self.write_bulk(documents).await,
        }
    }

    async fn write_bulk(&self, documents: &[D]) -> StorageResult<()> {
        for document in documents {
            require_identifier(document.identifier())?;
        }

        let mut lines = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            lines.push(json!({
                "index": {
                    "_index": self.target.index.to_string(),
                    "_type": self.target.doc_type.to_string(),
                    "_id": document.identifier()
                }
            }));
            lines.push(document.to_document()?);
        }

        let params = merge_layers([
            self.config.parameters.for_method("bulk"),
            json!({ "body": lines }),
        ]);

        let response = self.connector.connection()?.bulk(params).await?;
        check_bulk_response(&response)?;

        tracing::debug!(
            "Bulk indexed {} documents into {}/{}",
            documents.len(),
            self.target.index,
            self.target.doc_type
        );
        Ok(())
    }

    /// Deletes a document. Blank identifiers are logged and ignored, as are
    /// documents that do not exist.
    pub async fn delete(&self, identifier: &str) -> StorageResult<()> {
        if identifier.trim().is_empty() {
            tracing::warn!("Ignoring delete with blank identifier");
            return Ok(());
        }

        let connection = self.connector.connection()?;

        // Deleting from a missing index would create it, so look first.
        let lookup = merge_layers([
            self.config.parameters.for_method("get"),
            self.target.document_params(identifier),
            json!({ "refresh": false }),
        ]);
        match connection.get(lookup).await {
            Ok(_) => {}
            Err(BackendError::NotFound { resource }) => {
                tracing::debug!("Skipping delete of '{}', {} not found", identifier, resource);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let params = merge_layers([
            self.config.parameters.for_method("delete"),
            self.target.document_params(identifier),
        ]);
        match connection.delete(params).await {
            Ok(_) => {
                tracing::debug!("Deleted document '{}'", identifier);
                Ok(())
            }
            Err(BackendError::NotFound { .. }) => {
                tracing::debug!("Document '{}' already deleted", identifier);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Bulk requests succeed as a whole even when single items fail.
fn check_bulk_response(response: &Value) -> StorageResult<()> {
    if response.get("errors").and_then(Value::as_bool) != Some(true) {
        return Ok(());
    }

    let failed = response
        .get("items")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("index"))
        .find(|action| action.get("error").is_some());

    let (status, body) = match failed {
        Some(action) => (
            action.get("status").and_then(Value::as_u64).unwrap_or(500) as u16,
            action["error"].to_string(),
        ),
        None => (500, response.to_string()),
    };
    Err(BackendError::Engine { status, body }.into())
}
