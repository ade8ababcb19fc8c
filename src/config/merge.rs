//! Deep merge for layered YAML configuration.
//!
//! Higher tiers override lower tiers key by key. Arrays are replaced, not
//! concatenated.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects merge recursively
/// - Scalars and arrays in `overlay` replace `base`
/// - A null `overlay` keeps `base` (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use compliance_tracker::config::deep_merge;
///
/// let base = json!({ "server": { "port": 2022, "host": "127.0.0.1" } });
/// let overlay = json!({ "server": { "port": 8080 } });
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged, json!({ "server": { "port": 8080, "host": "127.0.0.1" } }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold `deep_merge` over the values, later values winning.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
