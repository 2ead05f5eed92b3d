//! Quarry Elasticsearch Persistence Layer
//!
//! This crate translates abstract criteria queries into Elasticsearch query
//! documents and provides the data-access components built on top of them:
//! finders for projections and domain events, document writers and readers,
//! and index provisioning helpers.
//!
//! # Features
//!
//! - **Criteria translation**: attribute, range, spatial, full-text and
//!   custom criteria nested in AND/OR containers, with sort and paging
//! - **Stored and custom queries**: search templates and verbatim native queries
//! - **Search access**: get, multi-get, search, template search and scroll
//! - **Typed results**: `@type` discriminator dispatch through a type registry
//! - **Storage**: single, bulk and idempotent delete writes; paged reads
//!
//! # Backend Features
//!
//! - `elasticsearch` (default) - HTTP connector backed by the official client
//!
//! Without it the crate still builds; supply your own
//! [`Connection`](connector::Connection) through
//! [`StaticConnector`](connector::StaticConnector).
//!
//! # Architecture
//!
//! - [`query`] - Criteria model: criteria trees, sort, query kinds
//! - [`translation`] - Query translators and per-criteria filter handlers
//! - [`connector`] - Connection abstraction and the Elasticsearch connector
//! - [`finder`] - Search access layer and query dispatch
//! - [`mapper`] - Raw response to domain object mapping
//! - [`storage`] - Document writer and reader
//! - [`schema`] - Index creation, aliases, mappings and templates
//! - [`config`] - Configuration structs
//! - [`error`] - Error types for all operations
//!
//! # Translating a query
//!
//! ```
//! use quarry_persistence::config::TranslationConfig;
//! use quarry_persistence::query::{
//!     AttributeCriteria, Comparison, CriteriaQuery, Query, SearchCriteria, SortCriteria,
//! };
//! use quarry_persistence::translation::{CriteriaQueryTranslation, QueryTranslation};
//! use serde_json::json;
//!
//! let translation = CriteriaQueryTranslation::new(TranslationConfig::default()).unwrap();
//!
//! let query = Query::from(
//!     CriteriaQuery::new(0, 20)
//!         .with_search(SearchCriteria::new("dune"))
//!         .with_filter(AttributeCriteria::new("status", Comparison::equals("published")))
//!         .with_sort(SortCriteria::desc("created_at")),
//! );
//!
//! let native = translation.translate(&query).unwrap();
//! assert_eq!(native["size"], 20);
//! assert_eq!(
//!     native["body"]["query"]["bool"]["filter"],
//!     json!({"and": [{"term": {"status": "published"}}]})
//! );
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod connector;
pub mod error;
pub mod finder;
pub mod mapper;
pub mod merge;
pub mod query;
pub mod schema;
pub mod storage;
pub mod translation;

pub use error::{StorageError, StorageResult};
