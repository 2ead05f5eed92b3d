//! Discriminator-driven type registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{MappingError, StorageResult};

use super::{OBJECT_TYPE, ResultMapper, document_id};

/// Builds a typed entity from a stored field map.
pub trait EntityFactory<T>: Send + Sync {
    /// Builds the entity from its fields, the type marker already removed.
    fn create_entity(&self, fields: Map<String, Value>) -> StorageResult<T>;
}

impl<T, F> EntityFactory<T> for F
where
    F: Fn(Map<String, Value>) -> StorageResult<T> + Send + Sync,
{
    fn create_entity(&self, fields: Map<String, Value>) -> StorageResult<T> {
        self(fields)
    }
}

/// Maps discriminator values to entity factories.
///
/// Populated once at startup and shared read-only afterwards.
pub struct TypeRegistry<T> {
    factories: HashMap<String, Arc<dyn EntityFactory<T>>>,
}

impl<T> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

impl<T: 'static> TypeRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a discriminator value, replacing any previous one.
    pub fn register(&mut self, type_name: impl Into<String>, factory: impl EntityFactory<T> + 'static) {
        self.factories.insert(type_name.into(), Arc::new(factory));
    }

    /// Builder-style [`TypeRegistry::register`].
    pub fn with(mut self, type_name: impl Into<String>, factory: impl EntityFactory<T> + 'static) -> Self {
        self.register(type_name, factory);
        self
    }

    /// Registers a type that deserializes from its field map.
    pub fn register_deserializable<E>(&mut self, type_name: impl Into<String>)
    where
        E: DeserializeOwned + Into<T> + 'static,
    {
        let type_name = type_name.into();
        let name = type_name.clone();
        self.register(type_name, move |fields: Map<String, Value>| -> StorageResult<T> {
            let id = fields
                .get("identifier")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            serde_json::from_value::<E>(Value::Object(fields))
                .map(Into::into)
                .map_err(|e| {
                    MappingError::InvalidDocument {
                        id,
                        message: format!("{}: {}", name, e),
                    }
                    .into()
                })
        });
    }

    /// Returns the factory registered for `type_name`.
    pub fn get(&self, type_name: &str) -> StorageResult<&Arc<dyn EntityFactory<T>>> {
        self.factories.get(type_name).ok_or_else(|| {
            MappingError::UnknownType {
                type_name: type_name.to_string(),
            }
            .into()
        })
    }

    /// Whether a factory is registered for `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True when no type is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds an entity of the registered type `type_name`.
    pub fn create_entity(&self, type_name: &str, fields: Map<String, Value>) -> StorageResult<T> {
        self.get(type_name)?.create_entity(fields)
    }
}

/// Maps stored documents through a [`TypeRegistry`].
///
/// Reads the `@type` discriminator from `_source`, removes it from the field
/// map and hands the remaining fields to the registered factory. Used for
/// both projections and domain events.
pub struct RegistryMapper<T> {
    registry: Arc<TypeRegistry<T>>,
}

impl<T> Clone for RegistryMapper<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T> fmt::Debug for RegistryMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryMapper")
            .field("registry", &self.registry)
            .finish()
    }
}

impl<T> RegistryMapper<T> {
    /// Creates a mapper over a shared registry.
    pub fn new(registry: Arc<TypeRegistry<T>>) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &TypeRegistry<T> {
        &self.registry
    }
}

impl<T: Send + 'static> ResultMapper for RegistryMapper<T> {
    type Item = T;

    fn map_document(&self, document: &Value) -> StorageResult<T> {
        let id = document_id(document);
        let mut fields = match document.get("_source") {
            Some(Value::Object(source)) => source.clone(),
            _ => {
                return Err(MappingError::InvalidDocument {
                    id,
                    message: "document has no _source object".to_string(),
                }
                .into());
            }
        };

        let type_name = match fields.remove(OBJECT_TYPE) {
            Some(Value::String(type_name)) if !type_name.is_empty() => type_name,
            _ => return Err(MappingError::MissingTypeInformation { id }.into()),
        };

        self.registry.create_entity(&type_name, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Author {
        identifier: String,
        name: String,
    }

    #[derive(Debug, PartialEq)]
    enum Entity {
        Author(Author),
        Raw(Map<String, Value>),
    }

    impl From<Author> for Entity {
        fn from(author: Author) -> Self {
            Entity::Author(author)
        }
    }

    fn mapper() -> RegistryMapper<Entity> {
        let mut registry = TypeRegistry::new()
            .with("Raw", |fields: Map<String, Value>| -> StorageResult<Entity> {
                Ok(Entity::Raw(fields))
            });
        registry.register_deserializable::<Author>("Author");
        RegistryMapper::new(Arc::new(registry))
    }

    #[test]
    fn test_discriminator_is_stripped() {
        let entity = mapper()
            .map_document(&json!({
                "_id": "1",
                "_source": {"@type": "Raw", "identifier": "1", "title": "Dune"}
            }))
            .unwrap();

        let Entity::Raw(fields) = entity else {
            panic!("expected raw entity");
        };
        assert!(!fields.contains_key("@type"));
        assert_eq!(fields["title"], "Dune");
    }

    #[test]
    fn test_deserializable_type() {
        let entity = mapper()
            .map_document(&json!({
                "_source": {"@type": "Author", "identifier": "a-1", "name": "Frank Herbert"}
            }))
            .unwrap();

        assert_eq!(
            entity,
            Entity::Author(Author {
                identifier: "a-1".to_string(),
                name: "Frank Herbert".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_deserializable_document() {
        let result = mapper().map_document(&json!({
            "_source": {"@type": "Author", "identifier": "a-1"}
        }));
        assert!(matches!(
            result,
            Err(StorageError::Mapping(MappingError::InvalidDocument { ref id, .. })) if id == "a-1"
        ));
    }

    #[test]
    fn test_missing_discriminator() {
        let result = mapper().map_document(&json!({"_id": "7", "_source": {"title": "x"}}));
        assert!(matches!(
            result,
            Err(StorageError::Mapping(MappingError::MissingTypeInformation { ref id })) if id == "7"
        ));
    }

    #[test]
    fn test_unknown_discriminator() {
        let result = mapper().map_document(&json!({"_source": {"@type": "Book"}}));
        assert!(matches!(
            result,
            Err(StorageError::Mapping(MappingError::UnknownType { ref type_name })) if type_name == "Book"
        ));
    }

    #[test]
    fn test_registry_debug_lists_types() {
        let debug = format!("{:?}", mapper().registry());
        assert!(debug.contains("Author"));
        assert!(debug.contains("Raw"));
    }
}
