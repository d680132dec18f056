//! Template Interpolator: `{key}` filling with tree-wide fallback search.

use super::node::{ConfigTree, NodeId, render_value};
use crate::format::format_with_missing_keys;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Field that holds the payload of a `{"value": ...}` block.
const VALUE_FIELD: &str = "value";

/// Fill `template` from `initial_values`, then from the tree.
///
/// Placeholders still missing after the first pass are looked up with a
/// breadth-first search starting at the root and radiating through both
/// parent and child links; the first node whose key equals the placeholder
/// supplies the value. A `{"value": x}` block contributes `x`; any other
/// non-null value is used as its text form. Placeholders nobody supplies
/// stay in the output as `{key}`.
pub fn resolve_formatted_string(
    template: &str,
    tree: &ConfigTree,
    initial_values: &HashMap<String, String>,
) -> String {
    resolve_formatted_string_with_missing(template, tree, initial_values).0
}

/// [`resolve_formatted_string`] plus the placeholders that stayed
/// unresolved, each listed once in template order.
pub fn resolve_formatted_string_with_missing(
    template: &str,
    tree: &ConfigTree,
    initial_values: &HashMap<String, String>,
) -> (String, Vec<String>) {
    fill_template(template, tree, tree.root(), initial_values, stringified_value)
}

/// Format the template stored in the node `id` itself.
///
/// The template is the node's string value, or the string inside a
/// `{"value": ...}` block. Any other value is returned in text form without
/// placeholder resolution. The fallback search starts at `id`, and only
/// string or integer values are taken from matching nodes.
pub fn resolve_format_string(
    tree: &ConfigTree,
    id: NodeId,
    initial_values: &HashMap<String, String>,
) -> String {
    let template = match tree.value(id) {
        Value::String(s) => s.as_str(),
        Value::Object(map) => match map.get(VALUE_FIELD) {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => return render_value(other),
            None => return render_value(tree.value(id)),
        },
        other => return render_value(other),
    };

    fill_template(template, tree, id, initial_values, scalar_value).0
}

/// Value a matching node contributes in [`resolve_formatted_string`].
fn stringified_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) if map.contains_key(VALUE_FIELD) => {
            map.get(VALUE_FIELD).map(render_value)
        }
        Value::Null => None,
        other => Some(render_value(other)),
    }
}

/// Value a matching node contributes in [`resolve_format_string`]: strings
/// and integers only.
fn scalar_value(value: &Value) -> Option<String> {
    let inner = match value {
        Value::Object(map) => map.get(VALUE_FIELD)?,
        other => other,
    };
    match inner {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn fill_template(
    template: &str,
    tree: &ConfigTree,
    start: NodeId,
    initial_values: &HashMap<String, String>,
    pick: fn(&Value) -> Option<String>,
) -> (String, Vec<String>) {
    let (formatted, missing) = format_with_missing_keys(template, initial_values);
    if missing.is_empty() {
        return (formatted, missing);
    }

    let mut values = initial_values.clone();
    let mut missing = distinct(missing);
    let mut visited = vec![false; tree.len()];
    let mut queue = VecDeque::from([start]);

    while !missing.is_empty() {
        let Some(id) = queue.pop_front() else { break };
        if std::mem::replace(&mut visited[id.index()], true) {
            continue;
        }

        let node = &tree[id];
        missing.retain(|key| {
            if !node.key().is(key) {
                return true;
            }
            match pick(tree.value(id)) {
                Some(value) => {
                    values.insert(key.clone(), value);
                    false
                }
                None => true,
            }
        });

        queue.extend(node.parent());
        queue.extend(node.next_nodes().iter().copied());
    }

    if !missing.is_empty() {
        debug!(unresolved = ?missing, "Template placeholders left unresolved");
    }

    (format_with_missing_keys(template, &values).0, missing)
}

/// Drop repeated keys, keeping first occurrences in order.
fn distinct(keys: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}
