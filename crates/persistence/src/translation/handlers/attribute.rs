//! Attribute filter handler.

use serde_json::{Value, json};

use crate::config::TranslationConfig;
use crate::error::{TranslationError, TranslationResult};
use crate::query::{AttributeCriteria, Comparand};
use crate::translation::QUERY_FOR_EMPTY;

/// Builds a `terms`, `term` or `missing` filter, negated where requested.
///
/// A scalar string starting with `!` is negated like an inverted comparison.
/// The prefix is stripped before the value is used.
pub fn build_filter(
    criteria: &AttributeCriteria,
    config: &TranslationConfig,
) -> TranslationResult<Value> {
    let path = criteria.attribute_path();
    let comparison = criteria.comparison();

    match comparison.comparand() {
        Comparand::List(values) => {
            let filter = json!({ "terms": { path: values } });
            Ok(negate_if(comparison.is_inverted(), filter))
        }
        Comparand::Scalar(value) => {
            let (prefixed, value) = strip_negation(value);
            let negate = comparison.is_inverted() || prefixed;

            let filter = if value.as_str() == Some(QUERY_FOR_EMPTY) {
                build_missing_filter(path)
            } else {
                build_term_filter(path, value, config)
            };
            Ok(negate_if(negate, filter))
        }
        Comparand::Geometry(_) => Err(TranslationError::UnsupportedGeometryType {
            attribute_path: path.to_string(),
            message: "geometries require a spatial criteria".to_string(),
        }),
    }
}

fn strip_negation(value: &Value) -> (bool, Value) {
    match value.as_str().and_then(|s| s.strip_prefix('!')) {
        Some(stripped) => (true, Value::String(stripped.to_string())),
        None => (false, value.clone()),
    }
}

fn build_missing_filter(path: &str) -> Value {
    json!({
        "missing": {
            "field": path,
            "existence": true,
            "null_value": true
        }
    })
}

fn build_term_filter(path: &str, value: Value, config: &TranslationConfig) -> Value {
    let field = if config.is_multi_field(path) {
        format!("{}.filter", path)
    } else {
        path.to_string()
    };
    json!({ "term": { field: value } })
}

fn negate_if(negate: bool, filter: Value) -> Value {
    if negate {
        json!({ "not": filter })
    } else {
        filter
    }
}
