//! Range filter handler.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::query::{Comparand, RangeCriteria};

/// Format sent alongside date comparands.
pub const DATE_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ssZ";

/// Builds a `range` filter from all comparisons of the criteria.
///
/// The comparisons share one map, so a comparator given twice keeps only its
/// last comparand. Date strings are normalized to ISO-8601 in UTC and set the
/// `format` key.
pub fn build_filter(criteria: &RangeCriteria) -> Value {
    let mut comparisons = Map::new();

    for comparison in criteria.items() {
        let comparand = match comparison.comparand() {
            Comparand::Scalar(value) => value.clone(),
            Comparand::List(values) => Value::Array(values.clone()),
            Comparand::Geometry(_) => continue,
        };

        let comparand = match normalize_date(&comparand) {
            Some(date) => {
                comparisons.insert("format".to_string(), json!(DATE_FORMAT));
                Value::String(date)
            }
            None => comparand,
        };

        comparisons.insert(comparison.operator().as_str().to_string(), comparand);
    }

    json!({ "range": { criteria.attribute_path(): comparisons } })
}

/// Returns the ISO-8601 form of a non-numeric string that parses as a date.
fn normalize_date(comparand: &Value) -> Option<String> {
    let text = comparand.as_str()?.trim();
    if text.is_empty() || text.parse::<f64>().is_ok() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;

    Some(parsed.to_rfc3339_opts(SecondsFormat::Secs, false))
}
