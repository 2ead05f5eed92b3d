//! Recursive merging of JSON parameter maps.
//!
//! Engine requests are assembled from several layers: per-method parameters
//! from configuration, the translated query and the target index/type. The
//! layers are combined with [`merge_recursive`].

use serde_json::{Map, Value};

/// Merges `source` into `target`.
///
/// Objects are merged key by key, arrays are concatenated and for any other
/// combination the value from `source` replaces the one in `target`.
pub fn merge_recursive(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            merge_maps(target_map, source_map);
        }
        (Value::Array(target_items), Value::Array(source_items)) => {
            target_items.extend(source_items);
        }
        (target, source) => {
            *target = source;
        }
    }
}

/// Merges every entry of `source` into `target`, see [`merge_recursive`].
pub fn merge_maps(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => merge_recursive(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

/// Merges a sequence of layers left to right into a fresh object.
pub fn merge_layers<I>(layers: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut merged = Value::Object(Map::new());
    for layer in layers {
        merge_recursive(&mut merged, layer);
    }
    merged
}
