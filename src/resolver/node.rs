//! Arena-backed configuration tree.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;

/// Key of the root node.
pub const ROOT_KEY: &str = "root";

/// Index of a node inside its [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The object key or array index a node was created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Name(String),
    Index(usize),
}

impl NodeKey {
    /// True when the key's string form equals `name`.
    pub fn is(&self, name: &str) -> bool {
        match self {
            NodeKey::Name(key) => key == name,
            NodeKey::Index(i) => i.to_string() == name,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Name(key) => write!(f, "{}", key),
            NodeKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Returned for a node whose key chain no longer leads into the source data.
static MISSING: Value = Value::Null;

/// One key/value entry of the configuration tree.
///
/// Nodes do not hold a copy of their value; [`ConfigTree::value`] looks it up
/// in the tree's source data by following the key chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    key: NodeKey,
    parent: Option<NodeId>,
    next_nodes: Vec<NodeId>,
    matches: BTreeSet<String>,
}

impl ConfigNode {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in source order.
    pub fn next_nodes(&self) -> &[NodeId] {
        &self.next_nodes
    }

    /// Tokens this node answers to during path resolution.
    pub fn matches(&self) -> &BTreeSet<String> {
        &self.matches
    }

    pub fn is_match(&self, token: &str) -> bool {
        self.matches.contains(token)
    }
}

/// A configuration tree. Node `0` is always the root.
///
/// Children are listed by [`NodeId`] and the parent link is a plain index.
/// The source mapping is stored once, at the tree level.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    data: Value,
    nodes: Vec<ConfigNode>,
}

impl ConfigTree {
    pub(super) fn with_root(data: Value, matches: BTreeSet<String>) -> Self {
        Self {
            data,
            nodes: vec![ConfigNode {
                key: NodeKey::Name(ROOT_KEY.to_string()),
                parent: None,
                next_nodes: Vec::new(),
                matches,
            }],
        }
    }

    /// Append a child under `parent` and return its id.
    pub(super) fn attach(
        &mut self,
        parent: NodeId,
        key: NodeKey,
        matches: BTreeSet<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConfigNode {
            key,
            parent: Some(parent),
            next_nodes: Vec::new(),
            matches,
        });
        self.nodes[parent.0].next_nodes.push(id);
        id
    }

    pub(super) fn add_matches(&mut self, id: NodeId, aliases: impl IntoIterator<Item = String>) {
        self.nodes[id.0].matches.extend(aliases);
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_node(&self) -> &ConfigNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&ConfigNode> {
        self.nodes.get(id.0)
    }

    /// The raw value at `id`, including any nested mapping or array that
    /// seeded its children.
    pub fn value(&self, id: NodeId) -> &Value {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self[current].parent {
            chain.push(&self[current].key);
            current = parent;
        }

        let mut value = &self.data;
        for key in chain.into_iter().rev() {
            let next = match (key, value) {
                (NodeKey::Name(name), Value::Object(map)) => map.get(name),
                (NodeKey::Index(i), Value::Array(items)) => items.get(*i),
                _ => None,
            };
            match next {
                Some(v) => value = v,
                None => return &MISSING,
            }
        }
        value
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true: a tree always holds its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their ids, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ConfigNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Look up a direct child of `id` by key.
    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self[id]
            .next_nodes
            .iter()
            .copied()
            .find(|child| self[*child].key.is(key))
    }

    /// Follow a literal key path from the root. Unlike path resolution this
    /// does no ranking or alias matching.
    pub fn lookup(&self, keys: &[&str]) -> Option<NodeId> {
        keys.iter()
            .try_fold(self.root(), |id, key| self.child(id, key))
    }
}

impl Index<NodeId> for ConfigTree {
    type Output = ConfigNode;

    fn index(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id.0]
    }
}

/// Short JSON type name for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text form of a value when substituted into a template: strings verbatim,
/// everything else as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_key_is() {
        assert!(NodeKey::Name("python".into()).is("python"));
        assert!(NodeKey::Index(2).is("2"));
        assert!(!NodeKey::Index(2).is("02"));
        assert!(!NodeKey::Index(2).is("+2"));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("abc")), "abc");
        assert_eq!(render_value(&json!(42)), "42");
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&json!(null)), "null");
        assert_eq!(render_value(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_values_follow_key_chain() {
        let data = json!({"a": {"b": [10, {"c": "deep"}]}});
        let tree = crate::resolver::build_tree(&data).unwrap();

        assert_eq!(tree.value(tree.root()), &data);
        let b = tree.lookup(&["a", "b"]).unwrap();
        assert_eq!(tree.value(b), &json!([10, {"c": "deep"}]));
        let c = tree.lookup(&["a", "b", "1", "c"]).unwrap();
        assert_eq!(tree.value(c), &json!("deep"));
        let first = tree.lookup(&["a", "b", "0"]).unwrap();
        assert_eq!(tree.value(first), &json!(10));
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(value_kind(&json!([])), "array");
        assert_eq!(value_kind(&json!({})), "object");
    }
}
