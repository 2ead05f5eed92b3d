//! Query translation.
//!
//! Each translator handles exactly one [`Query`] variant and fails with
//! [`TranslationError::UnsupportedQueryType`] for the others; dispatch by
//! variant happens in [`crate::finder::QueryService`].

mod criteria;
mod custom;
pub mod handlers;
mod search;
mod stored;

use serde_json::Value;

use crate::error::{TranslationError, TranslationResult};
use crate::query::Query;

pub use criteria::CriteriaQueryTranslation;
pub use custom::CustomQueryTranslation;
pub use stored::StoredQueryTranslation;

/// Comparand matching documents where the attribute is absent or null.
pub const QUERY_FOR_EMPTY: &str = "__empty";

/// Translates a query into engine request parameters.
pub trait QueryTranslation: Send + Sync {
    /// Returns the request parameters for `query`.
    fn translate(&self, query: &Query) -> TranslationResult<Value>;
}

fn unsupported(translator: &'static str, expected: &'static str, query: &Query) -> TranslationError {
    TranslationError::UnsupportedQueryType {
        translator,
        expected,
        actual: query.kind(),
    }
}
