//! Full-text search clause.

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::config::TranslationConfig;
use crate::error::{TranslationError, TranslationResult};
use crate::query::{Criteria, CriteriaList, SearchCriteria};

/// Field searched when a search criteria names no attribute.
pub const CATCH_ALL_FIELD: &str = "_all";

/// Sub-field holding the suggestion analyzer.
pub const SUGGEST_SUFFIX: &str = ".suggest";

/// Upper bound on prefix expansions of a suggestion query.
pub const SUGGEST_MAX_EXPANSIONS: u64 = 15;

/// Builds the query clause for a list of search criteria.
///
/// Only the first criteria is translated. An empty list matches everything.
pub(crate) fn build_query(
    criteria_list: &CriteriaList,
    suggest_pattern: &Regex,
    config: &TranslationConfig,
) -> TranslationResult<Value> {
    let Some(first) = criteria_list.first() else {
        return Ok(json!({ "match_all": {} }));
    };

    if criteria_list.len() > 1 {
        tracing::debug!(
            ignored = criteria_list.len() - 1,
            "Only the first search criteria is translated"
        );
    }

    let search = match first {
        Criteria::Search(search) => search,
        other => {
            return Err(TranslationError::UnsupportedSearchCriteria {
                criteria_type: other.kind(),
            });
        }
    };

    match suggest_pattern.captures(search.phrase()) {
        Some(captures) => {
            let path = captures.get(1).map_or("", |m| m.as_str());
            let term = captures.get(2).map_or("", |m| m.as_str());
            Ok(build_suggest_query(path, term))
        }
        None => Ok(build_match_query(search, config)),
    }
}

/// Keeps the even-indexed segments of `path` and appends the suggest suffix.
///
/// Odd segments are type qualifiers of embedded entities, which are not part
/// of the indexed field name.
fn suggest_field(path: &str) -> String {
    let segments: Vec<&str> = path.split('.').step_by(2).collect();
    format!("{}{}", segments.join("."), SUGGEST_SUFFIX)
}

fn build_suggest_query(path: &str, term: &str) -> Value {
    json!({
        "match_phrase_prefix": {
            suggest_field(path): {
                "query": term,
                "max_expansions": SUGGEST_MAX_EXPANSIONS
            }
        }
    })
}

fn build_match_query(search: &SearchCriteria, config: &TranslationConfig) -> Value {
    let field = match search.attribute_path().trim() {
        "" => CATCH_ALL_FIELD,
        field => field,
    };

    let mut settings = Map::new();
    settings.insert("type".to_string(), json!("phrase_prefix"));
    for (key, value) in &config.search_query_settings {
        settings.insert(key.clone(), value.clone());
    }
    settings.insert("query".to_string(), json!(search.phrase()));

    json!({ "match": { field: settings } })
}
