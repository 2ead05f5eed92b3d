//! Error types for the persistence layer.
//!
//! Errors are grouped by where they originate: caller input validation,
//! query translation, the search access layer, result mapping and the
//! engine backend. [`StorageError`] wraps every category so that public
//! operations can return a single [`StorageResult`].

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all persistence operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Malformed caller input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Query translation errors
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// Search access layer errors
    #[error(transparent)]
    Finder(#[from] FinderError),

    /// Raw document to domain object mapping errors
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Engine and transport errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true if the engine reported the addressed document, index or
    /// scroll context as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Backend(BackendError::NotFound { .. }))
    }
}

/// Errors caused by malformed caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// An argument failed validation.
    #[error("invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    /// A configuration value failed validation.
    #[error("invalid configuration '{key}': {message}")]
    InvalidConfig { key: String, message: String },
}

impl ValidationError {
    pub(crate) fn argument(argument: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidArgument {
            argument: argument.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while translating a query into the engine's query DSL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The translator does not handle this kind of query.
    #[error("unsupported query type '{actual}', {translator} expects a {expected} query")]
    UnsupportedQueryType {
        translator: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    /// A criteria node cannot be used in the list it was found in.
    #[error("invalid criteria type '{criteria_type}' given to filter translation")]
    InvalidCriteriaType { criteria_type: &'static str },

    /// The first search criteria is not a full-text search criteria.
    #[error("only search criteria are supported as search-criteria, got '{criteria_type}'")]
    UnsupportedSearchCriteria { criteria_type: &'static str },

    /// Spatial criteria only support the `in` comparison.
    #[error("invalid spatial query comparator '{operator}' on '{attribute_path}'")]
    UnsupportedSpatialOperator {
        attribute_path: String,
        operator: String,
    },

    /// The spatial comparand is not a supported geometry.
    #[error("invalid spatial comparand on '{attribute_path}': {message}")]
    UnsupportedGeometryType {
        attribute_path: String,
        message: String,
    },
}

/// Errors raised by the search access layer itself.
#[derive(Error, Debug)]
pub enum FinderError {
    /// A single-index API was configured with more than one index or type.
    #[error("{message}")]
    UnsupportedMultiIndex { message: String },
}

/// Errors raised while turning raw engine documents into domain objects.
#[derive(Error, Debug)]
pub enum MappingError {
    /// The stored document carries no type discriminator.
    #[error("invalid or corrupt type information within document data for _id: {id}")]
    MissingTypeInformation { id: String },

    /// The discriminator does not resolve to a registered type.
    #[error("no type registered for discriminator '{type_name}'")]
    UnknownType { type_name: String },

    /// The raw response has neither `_source`, `hits` nor `docs`.
    #[error("unsupported result data format: {data}")]
    UnsupportedResultFormat { data: String },

    /// A document could not be turned into the expected entity.
    #[error("invalid document '{id}': {message}")]
    InvalidDocument { id: String, message: String },
}

/// Errors originating from the search engine or its transport.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The engine answered with 404 for the addressed resource.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The engine rejected the request.
    #[error("engine returned status {status}: {body}")]
    Engine { status: u16, body: String },

    /// Connection to the engine failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for persistence operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for query translation.
pub type TranslationResult<T> = Result<T, TranslationError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "elasticsearch")]
impl From<elasticsearch::Error> for StorageError {
    fn from(err: elasticsearch::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "elasticsearch".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}
