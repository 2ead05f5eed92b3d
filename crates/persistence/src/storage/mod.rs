//! Document storage.
//!
//! [`ElasticsearchWriter`] indexes, bulk-indexes and deletes documents,
//! [`ElasticsearchReader`] reads single documents and pages through a whole
//! index. Structure-version lists are a concrete document kind with their
//! own mapping in [`structure_version`].

mod reader;
pub mod structure_version;
mod writer;

use serde_json::{Value, json};

use crate::config::{IndexSelection, StorageConfig};
use crate::connector::Connector;
use crate::error::{StorageResult, ValidationError};

pub use reader::ElasticsearchReader;
pub use structure_version::{
    StructureVersion, StructureVersionList, StructureVersionListReader,
    StructureVersionListWriter, StructureVersionMapper,
};
pub use writer::ElasticsearchWriter;

/// An entity that can be stored as one engine document.
pub trait Document: Send + Sync {
    /// Document id. Domain events use their event uuid.
    fn identifier(&self) -> &str;

    /// Document body.
    fn to_document(&self) -> StorageResult<Value>;
}

/// Index and type a storage component addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StorageTarget {
    pub index: IndexSelection,
    pub doc_type: IndexSelection,
}

impl StorageTarget {
    /// Resolves index and type from the storage config, falling back to the
    /// connector config. Both must be configured somewhere.
    pub fn resolve(config: &StorageConfig, connector: &dyn Connector) -> StorageResult<Self> {
        let index = config
            .index
            .clone()
            .or_else(|| connector.config().index.clone())
            .ok_or_else(|| missing_config("index"))?;
        let doc_type = config
            .doc_type
            .clone()
            .or_else(|| connector.config().doc_type.clone())
            .ok_or_else(|| missing_config("type"))?;

        Ok(Self { index, doc_type })
    }

    /// `{index, type}` request parameters.
    pub fn params(&self) -> Value {
        json!({
            "index": self.index.to_string(),
            "type": self.doc_type.to_string()
        })
    }

    /// `{index, type, id}` request parameters.
    pub fn document_params(&self, identifier: &str) -> Value {
        let mut params = self.params();
        params["id"] = json!(identifier);
        params
    }
}

/// Rejects blank document identifiers.
pub(crate) fn require_identifier(identifier: &str) -> StorageResult<()> {
    if identifier.trim().is_empty() {
        Err(ValidationError::argument("identifier", "must not be blank").into())
    } else {
        Ok(())
    }
}

fn missing_config(key: &str) -> ValidationError {
    ValidationError::InvalidConfig {
        key: key.to_string(),
        message: "not configured for storage or connector".to_string(),
    }
}
