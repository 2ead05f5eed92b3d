//! Search access layer.
//!
//! [`Finder`] executes get, multi-get, search, template search and scroll
//! requests and wraps the mapped results in a [`FinderResult`].
//! [`ElasticsearchFinder`] is the engine implementation; projection and
//! domain-event finders are instances of it with a
//! [`crate::mapper::RegistryMapper`]. [`QueryService`] runs a [`crate::query::Query`]
//! through the translator matching its kind.

mod elasticsearch;
mod service;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;

pub use elasticsearch::{ElasticsearchFinder, MGET_SIZE, SCROLL_SORT};
pub(crate) use elasticsearch::total_hits;
pub use service::QueryService;

/// One page of mapped results.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderResult<T> {
    items: Vec<T>,
    total_count: u64,
    offset: u64,
    cursor: Option<String>,
}

impl<T> FinderResult<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, total_count: u64, offset: u64, cursor: Option<String>) -> Self {
        Self {
            items,
            total_count,
            offset,
            cursor,
        }
    }

    /// A result with no items and a total of zero.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0, None)
    }

    /// Mapped items of this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the result, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// First item, if any.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of matching documents, which may exceed the page size.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Offset of the first item, 0 when unknown.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Scroll cursor for the next page, if any.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

/// Read access to stored entities.
#[async_trait]
pub trait Finder: Send + Sync {
    /// Type of the mapped items.
    type Item: Send;

    /// Fetches one document. A missing document yields an empty result.
    async fn get_by_identifier(&self, identifier: &str) -> StorageResult<FinderResult<Self::Item>>;

    /// Fetches several documents in one request, skipping missing ones.
    async fn get_by_identifiers(
        &self,
        identifiers: &[String],
    ) -> StorageResult<FinderResult<Self::Item>>;

    /// Runs a translated search request.
    async fn find(&self, query: Value) -> StorageResult<FinderResult<Self::Item>>;

    /// Runs a translated template search request.
    async fn find_by_stored(&self, query: Value) -> StorageResult<FinderResult<Self::Item>>;

    /// Opens a scroll and returns its first page with a cursor.
    async fn scroll_start(&self, query: Value) -> StorageResult<FinderResult<Self::Item>>;

    /// Returns the next page of a scroll. Callers must continue with the
    /// cursor of the returned result.
    async fn scroll_next(
        &self,
        cursor: &str,
        size: Option<u64>,
    ) -> StorageResult<FinderResult<Self::Item>>;

    /// Releases the scroll.
    async fn scroll_end(&self, cursor: &str) -> StorageResult<()>;
}
