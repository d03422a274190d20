//! JSON tree operations
//!
//! The tree follows realtime-database semantics: `null` means absent, and an
//! object left with no children disappears together with its key.

use serde_json::{Map, Value};

use crate::StorePath;

/// Value at `path`, if present
pub fn get<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Direct children of the object at `path`, in key order
pub fn children(root: &Value, path: &StorePath) -> Vec<(String, Value)> {
    match get(root, path).and_then(Value::as_object) {
        Some(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        None => Vec::new(),
    }
}

/// Store `value` at `path`, creating intermediate objects. Writing `null`
/// (or a value that prunes to nothing) removes the path instead.
pub fn set(root: &mut Value, path: &StorePath, value: Value) {
    let Some(value) = prune(value) else {
        remove(root, path);
        return;
    };

    set_at(root, path.segments(), value);
}

fn set_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        set_at(map.entry(head.clone()).or_insert(Value::Null), rest, value);
    }
}

/// Remove the value at `path` and any ancestors left empty.
/// Returns the removed value.
pub fn remove(root: &mut Value, path: &StorePath) -> Option<Value> {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        let old = std::mem::replace(root, Value::Null);
        return prune(old);
    };

    let removed = remove_at(root, parents, last);
    if root.as_object().is_some_and(Map::is_empty) {
        *root = Value::Null;
    }
    removed
}

fn remove_at(node: &mut Value, parents: &[String], last: &str) -> Option<Value> {
    let map = node.as_object_mut()?;
    match parents.split_first() {
        None => map.remove(last),
        Some((head, rest)) => {
            let child = map.get_mut(head)?;
            let removed = remove_at(child, rest, last);
            if child.as_object().is_some_and(Map::is_empty) {
                map.remove(head);
            }
            removed
        }
    }
}

/// Drop `null` leaves and empty objects. Returns `None` when nothing is left.
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k, v)))
                .collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        other => Some(other),
    }
}
