//! Pure operations on an in-memory JSON tree with realtime-store semantics.
//!
//! `null` leaves and empty objects are pruned so that "no data" always has a
//! single representation: absence.

use serde_json::{Map, Value};

use crate::path::StorePath;

/// Borrow the node at `path`, if present.
pub fn get<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Owned copy of the node at `path`.
pub fn snapshot(root: &Value, path: &StorePath) -> Option<Value> {
    get(root, path).cloned()
}

/// Replace the node at `path` with `value` (pruned), creating parents as needed.
///
/// Non-object nodes on the way are overwritten by objects.
pub fn set(root: &mut Value, path: &StorePath, value: Value) {
    let value = prune(value);
    if path.is_root() {
        *root = value.unwrap_or_else(|| Value::Object(Map::new()));
        return;
    }

    match value {
        Some(value) => {
            let mut node = root;
            let segments = path.segments();
            for segment in &segments[..segments.len() - 1] {
                node = ensure_object(node)
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
            if let Some(key) = path.key() {
                ensure_object(node).insert(key.to_string(), value);
            }
        }
        None => remove(root, path),
    }
}

/// Delete the node at `path` and any ancestors left empty.
pub fn remove(root: &mut Value, path: &StorePath) {
    if path.is_root() {
        *root = Value::Object(Map::new());
        return;
    }
    remove_in(root, path.segments());
}

fn remove_in(node: &mut Value, segments: &[String]) {
    let Some(map) = node.as_object_mut() else {
        return;
    };
    let (head, rest) = (&segments[0], &segments[1..]);
    if rest.is_empty() {
        map.remove(head);
        return;
    }
    let now_empty = match map.get_mut(head) {
        Some(child) => {
            remove_in(child, rest);
            matches!(child, Value::Object(m) if m.is_empty())
        }
        None => false,
    };
    if now_empty {
        map.remove(head);
    }
}

/// Drop `null` leaves and empty objects; `None` when nothing is left.
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

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}
