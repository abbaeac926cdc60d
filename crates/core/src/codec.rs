// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The value codec (4.A): flatten/unflatten nested values to and from the
//! flat string-keyed, string-valued map used on the action-plugin wire.

use crate::value::{parse_byte_array, Value};
use indexmap::IndexMap;

/// Flattens a nested [`Value::Map`] into a flat map from dotted/indexed
/// path strings (e.g. `res.rows.0.name`) to strings.
///
/// Emission order is not meaningful; callers that need a stable order
/// should sort the returned map's keys themselves.
pub fn flatten(value: &Value) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    flatten_into(value, None, &mut out);
    out
}

fn flatten_into(value: &Value, prefix: Option<&str>, out: &mut IndexMap<String, String>) {
    match value {
        Value::Map(map) => {
            for (k, v) in map {
                let path = join(prefix, k);
                flatten_into(v, Some(&path), out);
            }
        }
        Value::List(items) => {
            for (i, v) in items.iter().enumerate() {
                let path = join(prefix, &i.to_string());
                flatten_into(v, Some(&path), out);
            }
        }
        scalar => {
            let path = prefix.unwrap_or("").to_string();
            out.insert(path, scalar.to_text());
        }
    }
}

fn join(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}.{key}"),
        _ => key.to_string(),
    }
}

/// Intermediate tree used while rebuilding a nested [`Value`] from a flat
/// map; a node is either a terminal string or a set of named children.
enum Node {
    Leaf(String),
    Children(IndexMap<String, Node>),
}

/// Unflattens a flat path-string map back into a nested [`Value::Map`].
///
/// A path component that parses as a non-negative integer begins a list;
/// otherwise a mapping. Scalars are re-typed by longest-match parse (int,
/// then float, then bool, then string); numeric-array strings are
/// re-expanded to lists of integers — this is the one documented
/// promotion the codec's round-trip property allows (a `Value::Bytes` that
/// was flattened comes back as `Value::List` of `Value::Int`).
pub fn unflatten(map: &IndexMap<String, String>) -> Value {
    let mut root: IndexMap<String, Node> = IndexMap::new();
    for (path, val) in map {
        insert_path(&mut root, path, val.clone());
    }
    node_to_value(Node::Children(root))
}

fn insert_path(children: &mut IndexMap<String, Node>, path: &str, value: String) {
    let mut parts = path.split('.');
    let Some(first) = parts.next() else {
        return;
    };
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        children.insert(first.to_string(), Node::Leaf(value));
        return;
    }
    let entry = children
        .entry(first.to_string())
        .or_insert_with(|| Node::Children(IndexMap::new()));
    if let Node::Children(sub) = entry {
        insert_path(sub, &rest.join("."), value);
    } else {
        // A leaf was previously inserted at this exact path; a longer
        // path now wants to nest under it. Promote it to children,
        // discarding the now-ambiguous leaf (last write wins).
        let mut sub = IndexMap::new();
        insert_path(&mut sub, &rest.join("."), value);
        *entry = Node::Children(sub);
    }
}

fn node_to_value(node: Node) -> Value {
    match node {
        Node::Leaf(s) => typed_value(&s),
        Node::Children(children) => {
            let all_numeric_keys = !children.is_empty()
                && children.keys().all(|k| is_non_negative_int(k));
            if all_numeric_keys {
                let mut indexed: Vec<(u64, Node)> = children
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<u64>().ok().map(|i| (i, v)))
                    .collect();
                indexed.sort_by_key(|(i, _)| *i);
                Value::List(indexed.into_iter().map(|(_, v)| node_to_value(v)).collect())
            } else {
                let mut out = IndexMap::new();
                for (k, v) in children {
                    out.insert(k, node_to_value(v));
                }
                Value::Map(out)
            }
        }
    }
}

fn is_non_negative_int(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Longest-match scalar re-typing used by unflatten and by the struct
/// mapper's coercion rules.
pub fn typed_value(s: &str) -> Value {
    if let Some(bytes) = parse_byte_array(s) {
        return Value::List(bytes.into_iter().map(|b| Value::Int(b as i64)).collect());
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    match s {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    Value::String(s.to_string())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
