//! Accessors over nodes and traversal hits.
//!
//! These take the node explicitly; results are never mutated to carry
//! helper methods.

use serde_json::Value;

use crate::types::Hit;

/// Look up a single key: an object entry, or an array element for numeric keys.
pub fn lookup_key<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Follow a dotted path of keys.
///
/// An empty path returns the node itself.
pub fn get<'a>(node: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(node);
    }
    path.split('.')
        .try_fold(node, |current, key| lookup_key(current, key))
}

pub fn has(node: &Value, path: &str) -> bool {
    get(node, path).is_some()
}

/// Keys of an object, or indices of an array.
pub fn keys(node: &Value) -> Vec<String> {
    match node {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

pub fn values(node: &Value) -> Vec<&Value> {
    match node {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    }
}

/// Truthiness of a JSON value: `null`, `false`, `0` and `""` are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn find<'a, P>(hits: &'a [Hit], mut predicate: P) -> Option<&'a Hit>
where
    P: FnMut(&Value) -> bool,
{
    hits.iter().find(|hit| predicate(&hit.value))
}

pub fn map_nodes<T, F>(hits: &[Hit], f: F) -> Vec<T>
where
    F: FnMut(&Hit) -> T,
{
    hits.iter().map(f).collect()
}

pub fn filter_nodes<'a, P>(hits: &'a [Hit], mut predicate: P) -> Vec<&'a Hit>
where
    P: FnMut(&Value) -> bool,
{
    hits.iter().filter(|hit| predicate(&hit.value)).collect()
}

pub fn fold_nodes<T, F>(hits: &[Hit], init: T, f: F) -> T
where
    F: FnMut(T, &Hit) -> T,
{
    hits.iter().fold(init, f)
}
