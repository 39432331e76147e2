//! Flattening of nested template data into dotted variable paths.

use serde_json::Value;

/// Flatten a data tree into `(dotted.path, leaf value)` pairs.
///
/// Objects contribute their keys, arrays their indices (`userlist.0.name`), in
/// both cases joined with `.`, matching how templates address nested values.
/// Empty objects and arrays are kept as leaves so no key disappears from the
/// listing. Pairs come out in document order (object keys sorted).
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(&mut out, String::new(), value);
    out
}

fn flatten_into(out: &mut Vec<(String, Value)>, prefix: String, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(out, join(&prefix, key), child);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(out, join(&prefix, &index.to_string()), child);
            }
        }
        leaf => out.push((prefix, leaf.clone())),
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}
