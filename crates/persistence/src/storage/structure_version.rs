//! Structure-version lists.
//!
//! A structure-version list records which migrations have been applied to a
//! named target. It is stored as `{identifier, versions: [...]}` without a
//! type discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MappingError, StorageResult};
use crate::mapper::{ResultMapper, document_id};

use super::{Document, ElasticsearchReader, ElasticsearchWriter};

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureVersion {
    /// Index or type the migration was applied to.
    pub target_name: String,
    /// Version identifier of the migration.
    pub version: String,
    /// When the migration was applied.
    pub created_date: DateTime<Utc>,
}

/// Applied migrations of one target, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureVersionList {
    identifier: String,
    #[serde(default)]
    versions: Vec<StructureVersion>,
}

impl StructureVersionList {
    /// Creates an empty list.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            versions: Vec::new(),
        }
    }

    /// Appends an applied version.
    pub fn push(&mut self, version: StructureVersion) {
        self.versions.push(version);
    }

    /// Applied versions, oldest first.
    pub fn versions(&self) -> &[StructureVersion] {
        &self.versions
    }

    /// Most recently applied version.
    pub fn last(&self) -> Option<&StructureVersion> {
        self.versions.last()
    }

    /// True when nothing has been applied.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl Document for StructureVersionList {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn to_document(&self) -> StorageResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Builds [`StructureVersionList`]s from `_source`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureVersionMapper;

impl ResultMapper for StructureVersionMapper {
    type Item = StructureVersionList;

    fn map_document(&self, document: &Value) -> StorageResult<StructureVersionList> {
        let source = document.get("_source").cloned().unwrap_or(Value::Null);
        serde_json::from_value(source).map_err(|e| {
            MappingError::InvalidDocument {
                id: document_id(document),
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Writer for structure-version lists.
pub type StructureVersionListWriter = ElasticsearchWriter<StructureVersionList>;

/// Reader for structure-version lists.
pub type StructureVersionListReader = ElasticsearchReader<StructureVersionMapper>;
