//! Textual projections for inspection and conversion tooling.
//!
//! All projections are one-way: nothing here is parsed back.

mod summary;

use std::collections::HashSet;
use std::fmt::Write;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::tree::{NodeId, Tree};
use crate::util::{Error, Result};

const INDENT: &str = "    ";

/// Plain-text dump of a tree, one line per property or object.
///
/// ```text
/// pdxasset (int, 2):  [1, 0]
/// object:
///     body:
///         mesh:
///             p (float, 9):  [0.0, 0.0, ...]
/// ```
pub fn render_tree(tree: &Tree) -> String {
    let mut out = String::new();
    render_node(tree, tree.root(), &mut out);
    out
}

fn render_node(tree: &Tree, id: NodeId, out: &mut String) {
    let node = tree.node(id);
    // Content sits one level deeper than the node's own label.
    let indent = INDENT.repeat(node.depth());
    for prop in node.properties() {
        let _ = writeln!(
            out,
            "{}{} ({}, {}):  {}",
            indent,
            prop.name,
            prop.value.type_name(),
            prop.value.len(),
            prop.value
        );
    }
    for child in node.children() {
        let _ = writeln!(out, "{}{}:", indent, tree.node(*child).name());
        render_node(tree, *child, out);
    }
}

/// Nested JSON object of a tree.
///
/// Keys keep stream order. Sibling objects sharing a name collapse into an
/// array under that name.
pub fn tree_to_json(tree: &Tree) -> Value {
    node_to_json(tree, tree.root())
}

fn node_to_json(tree: &Tree, id: NodeId) -> Value {
    let node = tree.node(id);
    let mut map = Map::new();
    let mut collapsed = HashSet::new();
    for prop in node.properties() {
        let value = serde_json::to_value(&prop.value).unwrap_or(Value::Null);
        insert_collapsing(&mut map, &mut collapsed, &prop.name, value);
    }
    for child in node.children() {
        insert_collapsing(&mut map, &mut collapsed, tree.node(*child).name(), node_to_json(tree, *child));
    }
    Value::Object(map)
}

/// Insert `value`, turning a repeated key into an array of every value.
///
/// `collapsed` holds the keys already turned into arrays, since a single
/// value may itself be an array.
fn insert_collapsing(map: &mut Map<String, Value>, collapsed: &mut HashSet<String>, key: &str, value: Value) {
    let Some(existing) = map.get_mut(key) else {
        map.insert(key.to_string(), value);
        return;
    };
    if collapsed.contains(key) {
        if let Value::Array(items) = existing {
            items.push(value);
        }
    } else {
        let first = existing.take();
        *existing = Value::Array(vec![first, value]);
        collapsed.insert(key.to_string());
    }
}

/// Serialise any model (tree JSON, `Asset`, `AnimationTrack`) to a JSON string.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let s = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    s.map_err(|e| Error::Io(e.into()))
}
