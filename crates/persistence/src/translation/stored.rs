//! Stored query translation.

use serde_json::{Value, json};

use crate::config::StoredQueryConfig;
use crate::error::TranslationResult;
use crate::query::Query;

use super::{QueryTranslation, unsupported};

/// Translates [`crate::query::StoredQuery`] values into template search
/// parameters: `{body: {<id|file>: name, params: {..., from, size}}}`.
#[derive(Debug, Clone, Default)]
pub struct StoredQueryTranslation {
    config: StoredQueryConfig,
}

impl StoredQueryTranslation {
    /// Creates the translation.
    pub fn new(config: StoredQueryConfig) -> Self {
        Self { config }
    }
}

impl QueryTranslation for StoredQueryTranslation {
    fn translate(&self, query: &Query) -> TranslationResult<Value> {
        let Query::Stored(stored) = query else {
            return Err(unsupported("StoredQueryTranslation", "stored", query));
        };

        let mut params = stored.parameters().clone();
        params.insert("from".to_string(), json!(stored.offset()));
        params.insert("size".to_string(), json!(stored.limit()));

        Ok(json!({
            "body": {
                self.config.method.as_str(): stored.name(),
                "params": params
            }
        }))
    }
}
