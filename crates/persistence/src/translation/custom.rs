//! Custom query translation.

use serde_json::Value;

use crate::error::TranslationResult;
use crate::query::Query;

use super::{QueryTranslation, unsupported};

/// Passes the native query of a [`crate::query::CustomQuery`] through.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomQueryTranslation;

impl QueryTranslation for CustomQueryTranslation {
    fn translate(&self, query: &Query) -> TranslationResult<Value> {
        match query {
            Query::Custom(custom) => Ok(custom.query().clone()),
            other => Err(unsupported("CustomQueryTranslation", "custom", other)),
        }
    }
}
