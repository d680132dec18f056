//! Tree Builder: nested JSON mapping to [`ConfigTree`].

use super::node::{ConfigTree, NodeKey, ROOT_KEY, value_kind};
use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Object key whose array lists extra match tokens for the enclosing block.
pub const ALIASES_KEY: &str = "aliases";

/// Build a tree from a top-level JSON object.
///
/// Expansion uses an explicit LIFO work stack, so arbitrarily deep configs
/// never recurse. An `aliases` array inside an object adds its entries to the
/// node owning that object and produces no child.
pub fn build_tree(data: &Value) -> ConfigResult<ConfigTree> {
    if !data.is_object() {
        return Err(ConfigError::NotAMapping {
            found: value_kind(data).to_string(),
        });
    }

    let root_key = NodeKey::Name(ROOT_KEY.to_string());
    let mut tree = ConfigTree::with_root(data.clone(), seed_matches(&root_key, data)?);
    let mut stack = vec![(tree.root(), data)];

    while let Some((parent, raw)) = stack.pop() {
        match raw {
            Value::Object(map) => {
                for (key, value) in map {
                    if key == ALIASES_KEY {
                        let aliases = alias_tokens(value)?;
                        tree.add_matches(parent, aliases);
                        continue;
                    }
                    let key = NodeKey::Name(key.clone());
                    let matches = seed_matches(&key, value)?;
                    let child = tree.attach(parent, key, matches);
                    stack.push((child, value));
                }
            }
            Value::Array(items) => {
                for (index, value) in items.iter().enumerate() {
                    let key = NodeKey::Index(index);
                    let matches = seed_matches(&key, value)?;
                    let child = tree.attach(parent, key, matches);
                    stack.push((child, value));
                }
            }
            _ => {}
        }
    }

    debug!(nodes = tree.len(), "Built config tree");
    Ok(tree)
}

/// Initial match set of a new node: its own key plus the aliases declared
/// directly inside its value.
fn seed_matches(key: &NodeKey, value: &Value) -> ConfigResult<BTreeSet<String>> {
    let mut matches = BTreeSet::new();
    matches.insert(key.to_string());
    if let Some(aliases) = value.get(ALIASES_KEY) {
        matches.extend(alias_tokens(aliases)?);
    }
    Ok(matches)
}

/// Alias entries as match tokens. Strings are taken verbatim, numbers and
/// booleans by their JSON text; nested containers and null are rejected.
fn alias_tokens(aliases: &Value) -> ConfigResult<Vec<String>> {
    let Value::Array(items) = aliases else {
        return Err(ConfigError::InvalidAliases {
            found: value_kind(aliases).to_string(),
        });
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ConfigError::InvalidAliasEntry {
                found: value_kind(other).to_string(),
            }),
        })
        .collect()
}
