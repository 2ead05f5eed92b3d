//! Result mapping.
//!
//! A [`ResultMapper`] turns raw engine responses into domain objects. The
//! provided [`ResultMapper::map_result_data`] understands the three response
//! shapes the engine produces:
//!
//! - a single document (`get`), recognised by a top-level `_source`
//! - search hits (`search`, `scroll`, template search) under `hits.hits`
//! - multi-get documents under `docs`, where entries with `found: false`
//!   are skipped

mod registry;

use serde_json::Value;

use crate::error::{MappingError, StorageResult};

pub use registry::{EntityFactory, RegistryMapper, TypeRegistry};

/// Reserved document field naming the concrete type of a stored entity.
pub const OBJECT_TYPE: &str = "@type";

/// Converts raw engine documents into typed values.
pub trait ResultMapper: Send + Sync {
    /// Type produced for each document.
    type Item: Send;

    /// Maps one document carrying `_id` and `_source`.
    fn map_document(&self, document: &Value) -> StorageResult<Self::Item>;

    /// Maps a complete raw response.
    fn map_result_data(&self, data: &Value) -> StorageResult<Vec<Self::Item>> {
        if data.get("_source").is_some() {
            return Ok(vec![self.map_document(data)?]);
        }

        if let Some(hits) = data.get("hits") {
            return hits
                .get("hits")
                .and_then(Value::as_array)
                .map(|hits| hits.iter().map(|hit| self.map_document(hit)).collect())
                .unwrap_or_else(|| Ok(Vec::new()));
        }

        if let Some(docs) = data.get("docs").and_then(Value::as_array) {
            return docs
                .iter()
                .filter(|doc| doc.get("found").and_then(Value::as_bool) == Some(true))
                .map(|doc| self.map_document(doc))
                .collect();
        }

        Err(MappingError::UnsupportedResultFormat {
            data: data.to_string(),
        }
        .into())
    }
}

/// Returns the `_id` of a raw document, or an empty string.
pub(crate) fn document_id(document: &Value) -> String {
    document
        .get("_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Passes `_source` objects through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceMapper;

impl ResultMapper for SourceMapper {
    type Item = Value;

    fn map_document(&self, document: &Value) -> StorageResult<Value> {
        document.get("_source").cloned().ok_or_else(|| {
            MappingError::InvalidDocument {
                id: document_id(document),
                message: "document has no _source".to_string(),
            }
            .into()
        })
    }
}
