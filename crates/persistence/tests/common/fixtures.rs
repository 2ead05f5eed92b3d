//! Projection and event fixtures.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use quarry_persistence::StorageResult;
use quarry_persistence::mapper::{OBJECT_TYPE, RegistryMapper, TypeRegistry};
use quarry_persistence::storage::Document;

pub const BOOK_TYPE: &str = "quarry.library.book";
pub const AUTHOR_TYPE: &str = "quarry.library.author";
pub const BOOK_CREATED_TYPE: &str = "quarry.library.book_created";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl Book {
    pub fn new(identifier: &str, title: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: title.to_string(),
            status: Some("published".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub identifier: String,
    pub name: String,
}

/// Projections of the library fixture.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Book(Book),
    Author(Author),
}

impl From<Book> for Projection {
    fn from(book: Book) -> Self {
        Projection::Book(book)
    }
}

impl From<Author> for Projection {
    fn from(author: Author) -> Self {
        Projection::Author(author)
    }
}

impl Document for Projection {
    fn identifier(&self) -> &str {
        match self {
            Projection::Book(book) => &book.identifier,
            Projection::Author(author) => &author.identifier,
        }
    }

    fn to_document(&self) -> StorageResult<Value> {
        let (type_name, mut document) = match self {
            Projection::Book(book) => (BOOK_TYPE, serde_json::to_value(book)?),
            Projection::Author(author) => (AUTHOR_TYPE, serde_json::to_value(author)?),
        };
        document[OBJECT_TYPE] = json!(type_name);
        Ok(document)
    }
}

/// A domain event, stored under its uuid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookCreated {
    pub uuid: String,
    pub aggregate_root_identifier: String,
    pub seq_number: u64,
}

impl Document for BookCreated {
    fn identifier(&self) -> &str {
        &self.uuid
    }

    fn to_document(&self) -> StorageResult<Value> {
        let mut document = serde_json::to_value(self)?;
        document[OBJECT_TYPE] = json!(BOOK_CREATED_TYPE);
        Ok(document)
    }
}

pub fn projection_mapper() -> RegistryMapper<Projection> {
    let mut registry = TypeRegistry::new();
    registry.register_deserializable::<Book>(BOOK_TYPE);
    registry.register_deserializable::<Author>(AUTHOR_TYPE);
    RegistryMapper::new(Arc::new(registry))
}

pub fn event_mapper() -> RegistryMapper<BookCreated> {
    let mut registry = TypeRegistry::new();
    registry.register_deserializable::<BookCreated>(BOOK_CREATED_TYPE);
    RegistryMapper::new(Arc::new(registry))
}

/// Stored `_source` of a book.
pub fn book_source(identifier: &str, title: &str) -> Value {
    json!({
        "@type": BOOK_TYPE,
        "identifier": identifier,
        "title": title,
        "status": "published"
    })
}

/// A search hit or get response.
pub fn hit(identifier: &str, source: Value) -> Value {
    json!({
        "_index": "library",
        "_type": "book",
        "_id": identifier,
        "found": true,
        "_source": source
    })
}

/// A search response with the total in the `{value}` shape.
pub fn search_response(total: u64, hits: Vec<Value>) -> Value {
    json!({
        "took": 1,
        "timed_out": false,
        "hits": {
            "total": {"value": total, "relation": "eq"},
            "hits": hits
        }
    })
}

/// A scroll response carrying `scroll_id`.
pub fn scroll_response(scroll_id: &str, total: u64, hits: Vec<Value>) -> Value {
    let mut response = search_response(total, hits);
    response["_scroll_id"] = json!(scroll_id);
    response
}
