//! Index provisioning.
//!
//! Indices are created under a timestamped name (`books_20240301120000`)
//! and reached through an alias carrying the logical name (`books`), so a
//! later migration can build a new index and move the alias over.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::connector::Connection;
use crate::error::{BackendError, StorageError, StorageResult, ValidationError};

/// Timestamp format of versioned index names.
pub const INDEX_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Definition of one logical index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Logical name, used as the alias of the concrete index.
    pub index: String,

    /// Index creation body (settings, analysis, mappings).
    #[serde(default)]
    pub settings: Option<Value>,

    /// Type mappings by type name.
    #[serde(default)]
    pub mappings: BTreeMap<String, Value>,
}

impl IndexSchema {
    /// Schema for `index` without settings or mappings.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Default::default()
        }
    }

    /// Sets the index settings.
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Adds the mapping for one type.
    pub fn with_mapping(mut self, type_name: impl Into<String>, mapping: Value) -> Self {
        self.mappings.insert(type_name.into(), mapping);
        self
    }

    fn validate(&self) -> StorageResult<()> {
        if self.index.trim().is_empty() {
            return Err(ValidationError::argument("index", "must not be blank").into());
        }
        Ok(())
    }

    /// Creation body: configured settings plus the alias, and the type
    /// mappings when `include_mappings` is set.
    pub fn creation_body(&self, include_mappings: bool) -> Value {
        let mut body = match &self.settings {
            Some(Value::Object(settings)) => settings.clone(),
            _ => Map::new(),
        };

        let aliases = body
            .entry("aliases")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(aliases) = aliases {
            aliases.insert(self.index.clone(), json!({}));
        }

        if include_mappings && !self.mappings.is_empty() {
            let mappings = body
                .entry("mappings")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(mappings) = mappings {
                for (type_name, mapping) in &self.mappings {
                    mappings.insert(type_name.clone(), mapping.clone());
                }
            }
        }

        Value::Object(body)
    }
}

/// Concrete index name for `index` created at `at`.
pub fn versioned_index_name(index: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", index, at.format(INDEX_TIMESTAMP_FORMAT))
}

/// Creates the index unless the name is taken by an index or an alias, in
/// which case the type mappings are updated instead.
pub async fn ensure_index(
    connection: &dyn Connection,
    schema: &IndexSchema,
    include_mappings: bool,
) -> StorageResult<()> {
    schema.validate()?;

    let exists = connection
        .indices()
        .exists(json!({ "index": schema.index }))
        .await?;

    if !exists && alias_mapping(connection, &schema.index).await?.is_empty() {
        match create_index(connection, schema, include_mappings).await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                tracing::debug!("Index '{}' was created concurrently", schema.index);
                update_mappings(connection, schema).await
            }
            Err(e) => Err(e),
        }
    } else {
        update_mappings(connection, schema).await
    }
}

fn is_already_exists(error: &StorageError) -> bool {
    matches!(
        error,
        StorageError::Backend(BackendError::Engine { status: 400, body })
            if body.contains("resource_already_exists_exception")
    )
}

/// Creates a timestamped index aliased to the logical name and returns the
/// concrete name.
pub async fn create_index(
    connection: &dyn Connection,
    schema: &IndexSchema,
    include_mappings: bool,
) -> StorageResult<String> {
    schema.validate()?;

    let name = versioned_index_name(&schema.index, Utc::now());
    connection
        .indices()
        .create(json!({
            "index": name,
            "body": schema.creation_body(include_mappings)
        }))
        .await?;

    tracing::info!("Created Elasticsearch index '{}' aliased as '{}'", name, schema.index);
    Ok(name)
}

/// Deletes the index if it exists.
pub async fn delete_index(connection: &dyn Connection, index: &str) -> StorageResult<()> {
    let params = json!({ "index": index });
    if !connection.indices().exists(params.clone()).await? {
        tracing::debug!("Index '{}' does not exist, nothing to delete", index);
        return Ok(());
    }

    connection.indices().delete(params).await?;
    tracing::info!("Deleted Elasticsearch index '{}'", index);
    Ok(())
}

/// Puts every type mapping of the schema.
pub async fn update_mappings(connection: &dyn Connection, schema: &IndexSchema) -> StorageResult<()> {
    for (type_name, mapping) in &schema.mappings {
        let mut body = Map::new();
        body.insert(type_name.clone(), mapping.clone());
        connection
            .indices()
            .put_mapping(json!({
                "index": schema.index,
                "type": type_name,
                "body": body
            }))
            .await?;
        tracing::debug!("Updated mapping of '{}/{}'", schema.index, type_name);
    }
    Ok(())
}

/// Concrete indices behind `alias`, empty when none.
pub async fn alias_mapping(connection: &dyn Connection, alias: &str) -> StorageResult<Map<String, Value>> {
    match connection.indices().get_alias(json!({ "name": alias })).await {
        Ok(Value::Object(aliases)) => Ok(aliases),
        Ok(_) => Ok(Map::new()),
        Err(BackendError::NotFound { .. }) => Ok(Map::new()),
        Err(e) => Err(e.into()),
    }
}

/// Settings and mappings of an existing index, keyed like the creation body.
pub async fn index_definition(connection: &dyn Connection, index: &str) -> StorageResult<Value> {
    let params = json!({ "index": index });
    let settings = connection.indices().get_settings(params.clone()).await?;
    let mappings = connection.indices().get_mapping(params).await?;

    // Both responses are keyed by the concrete index name.
    let first = |response: &Value, key: &str| -> Value {
        response
            .as_object()
            .and_then(|by_index| by_index.values().next())
            .and_then(|definition| definition.get(key))
            .cloned()
            .unwrap_or_else(|| json!({}))
    };

    Ok(json!({
        "settings": first(&settings, "settings"),
        "mappings": first(&mappings, "mappings")
    }))
}

/// Moves `alias` from index `from` to index `to` in one atomic request.
pub async fn switch_alias(
    connection: &dyn Connection,
    alias: &str,
    from: &str,
    to: &str,
) -> StorageResult<()> {
    connection
        .indices()
        .update_aliases(json!({
            "body": {
                "actions": [
                    { "remove": { "alias": alias, "index": from } },
                    { "add": { "alias": alias, "index": to } }
                ]
            }
        }))
        .await?;

    tracing::info!("Switched alias '{}' from '{}' to '{}'", alias, from, to);
    Ok(())
}

/// Puts index templates by name.
pub async fn put_index_templates(
    connection: &dyn Connection,
    templates: &BTreeMap<String, Value>,
) -> StorageResult<()> {
    for (name, template) in templates {
        connection
            .indices()
            .put_template(json!({ "name": name, "body": template }))
            .await?;
        tracing::info!("Put Elasticsearch index template '{}'", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_versioned_index_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(versioned_index_name("books", at), "books_20240301123005");
    }

    #[test]
    fn test_creation_body_adds_alias() {
        let schema = IndexSchema::new("books")
            .with_settings(json!({"settings": {"number_of_shards": 1}}))
            .with_mapping("book", json!({"properties": {"title": {"type": "text"}}}));

        let body = schema.creation_body(false);
        assert_eq!(body["aliases"]["books"], json!({}));
        assert_eq!(body["settings"]["number_of_shards"], 1);
        assert!(body.get("mappings").is_none());

        let body = schema.creation_body(true);
        assert_eq!(body["mappings"]["book"]["properties"]["title"]["type"], "text");
    }

    #[test]
    fn test_creation_body_keeps_configured_mappings() {
        let schema = IndexSchema::new("books")
            .with_settings(json!({"mappings": {"author": {"properties": {}}}}))
            .with_mapping("book", json!({"properties": {}}));

        let body = schema.creation_body(true);
        let mappings = body["mappings"].as_object().unwrap();
        assert!(mappings.contains_key("author"));
        assert!(mappings.contains_key("book"));
    }
}
