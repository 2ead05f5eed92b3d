//! Criteria query translation.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::config::TranslationConfig;
use crate::error::{TranslationError, TranslationResult};
use crate::merge::merge_recursive;
use crate::query::{
    AttributeCriteria, BoolOperator, Comparison, Criteria, CriteriaList, CriteriaQuery, Query,
};

use super::handlers::{attribute, range, spatial};
use super::{QueryTranslation, search, unsupported};

/// `unmapped_type` hints for system attributes present on every document.
const BUILTIN_DYNAMIC_MAPPINGS: &[(&str, &str)] = &[
    ("identifier", "string"),
    ("referenced_identifier", "string"),
    ("uuid", "string"),
    ("language", "string"),
    ("version", "long"),
    ("revision", "long"),
    ("short_id", "long"),
    ("created_at", "date"),
    ("modified_at", "date"),
    ("workflow_state", "string"),
];

/// Translates [`CriteriaQuery`] values into search request parameters.
///
/// The output has the shape `{from, size, body: {query, sort}}`. Filters
/// are placed in a `bool` query's `filter` clause so that they do not
/// affect scoring.
#[derive(Debug, Clone)]
pub struct CriteriaQueryTranslation {
    config: TranslationConfig,
    suggest_pattern: Regex,
    dynamic_mappings: BTreeMap<String, String>,
}

impl CriteriaQueryTranslation {
    /// Creates a translator, compiling the configured suggest pattern.
    pub fn new(config: TranslationConfig) -> Result<Self, regex::Error> {
        let suggest_pattern = Regex::new(&config.suggest_pattern)?;

        let mut dynamic_mappings: BTreeMap<String, String> = BUILTIN_DYNAMIC_MAPPINGS
            .iter()
            .map(|(path, kind)| (path.to_string(), kind.to_string()))
            .collect();
        dynamic_mappings.extend(config.dynamic_mappings.clone());

        Ok(Self {
            config,
            suggest_pattern,
            dynamic_mappings,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    fn build_body(&self, query: &CriteriaQuery) -> TranslationResult<Value> {
        let mut filters = query.filter_criteria().clone();
        for (path, value) in &self.config.query_filters {
            filters.push(AttributeCriteria::new(path.clone(), Comparison::equals(value.clone())));
        }

        let filter = self.translate_filters(&filters)?;
        let mut es_query =
            search::build_query(query.search_criteria(), &self.suggest_pattern, &self.config)?;

        if !is_empty_object(&filter) {
            es_query = json!({
                "bool": {
                    "must": es_query,
                    "filter": filter
                }
            });
        }

        Ok(json!({
            "query": es_query,
            "sort": self.build_sort(query)
        }))
    }

    /// Translates a filter list into `{<operator>: [filters]}`, or `{}` when
    /// the list produces no filters.
    ///
    /// Nested lists sharing an operator are merged into the first entry
    /// produced for that operator.
    pub fn translate_filters(&self, list: &CriteriaList) -> TranslationResult<Value> {
        let mut filters: Vec<Value> = Vec::new();
        let mut container_positions: HashMap<BoolOperator, usize> = HashMap::new();

        for criteria in list.items() {
            match criteria {
                Criteria::Container(nested) => {
                    let nested_filter = self.translate_filters(nested)?;
                    if is_empty_object(&nested_filter) {
                        continue;
                    }
                    match container_positions.get(&nested.operator()) {
                        Some(&position) => merge_recursive(&mut filters[position], nested_filter),
                        None => {
                            container_positions.insert(nested.operator(), filters.len());
                            filters.push(nested_filter);
                        }
                    }
                }
                Criteria::Attribute(attribute) => {
                    filters.push(attribute::build_filter(attribute, &self.config)?);
                }
                Criteria::Range(range) => filters.push(range::build_filter(range)),
                Criteria::Spatial(spatial) => filters.push(spatial::build_filter(spatial)?),
                Criteria::Custom(custom) => filters.push(custom.query_part().clone()),
                Criteria::Search(_) => {
                    return Err(TranslationError::InvalidCriteriaType {
                        criteria_type: criteria.kind(),
                    });
                }
            }
        }

        if filters.is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        Ok(json!({ list.operator().as_str(): filters }))
    }

    fn build_sort(&self, query: &CriteriaQuery) -> Value {
        let sorts: Vec<Value> = query
            .sort_criteria()
            .iter()
            .map(|sort| {
                let path = sort.attribute_path();
                let mut options = Map::new();
                options.insert("order".to_string(), json!(sort.direction().as_str()));
                if let Some(kind) = self.dynamic_mappings.get(path) {
                    options.insert("unmapped_type".to_string(), json!(kind));
                }

                let field = if self.config.is_multi_field(path) {
                    format!("{}.sort", path)
                } else {
                    path.to_string()
                };
                json!({ field: options })
            })
            .collect();

        Value::Array(sorts)
    }
}

impl QueryTranslation for CriteriaQueryTranslation {
    fn translate(&self, query: &Query) -> TranslationResult<Value> {
        let Query::Criteria(criteria_query) = query else {
            return Err(unsupported("CriteriaQueryTranslation", "criteria", query));
        };

        Ok(json!({
            "from": criteria_query.offset(),
            "size": criteria_query.limit(),
            "body": self.build_body(criteria_query)?
        }))
    }
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(Map::is_empty)
}
