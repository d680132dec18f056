//! Structural checks and summary metrics for a built tree.

use super::node::ConfigTree;
use serde::Serialize;

/// Summary numbers for a config tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeMetrics {
    pub node_count: usize,
    /// Number of levels, counting the root as level 1.
    pub max_depth: usize,
    pub leaf_count: usize,
    /// Mean number of children per node.
    pub avg_children: f64,
    /// Sum of match-set sizes over all nodes.
    pub total_matches: usize,
}

/// Report broken parent/child links and empty match sets.
pub fn validate_tree(tree: &ConfigTree) -> Vec<String> {
    let mut errors = Vec::new();

    if tree.root_node().parent().is_some() {
        errors.push("root node has a parent".to_string());
    }

    for (id, node) in tree.iter() {
        if node.matches().is_empty() {
            errors.push(format!("node {} ({}) has no match tokens", id.index(), node.key()));
        }

        if let Some(parent) = node.parent() {
            match tree.get(parent) {
                None => errors.push(format!(
                    "node {} references missing parent {}",
                    id.index(),
                    parent.index()
                )),
                Some(p) => {
                    let listed = p.next_nodes().iter().filter(|c| **c == id).count();
                    if listed != 1 {
                        errors.push(format!(
                            "node {} listed {} times under parent {}",
                            id.index(),
                            listed,
                            parent.index()
                        ));
                    }
                }
            }
        } else if id != tree.root() {
            errors.push(format!("node {} has no parent", id.index()));
        }

        for child in node.next_nodes() {
            match tree.get(*child) {
                None => errors.push(format!(
                    "node {} references missing child {}",
                    id.index(),
                    child.index()
                )),
                Some(c) if c.parent() != Some(id) => errors.push(format!(
                    "child {} of node {} points to a different parent",
                    child.index(),
                    id.index()
                )),
                Some(_) => {}
            }
        }
    }

    errors
}

/// Compute [`TreeMetrics`].
pub fn tree_metrics(tree: &ConfigTree) -> TreeMetrics {
    // children are always created after their parent, so one forward pass
    // sees every parent's depth before its children
    let mut depth = vec![0usize; tree.len()];
    let mut leaf_count = 0;
    let mut total_children = 0;
    let mut total_matches = 0;

    for (id, node) in tree.iter() {
        depth[id.index()] = node.parent().map_or(1, |p| depth[p.index()] + 1);
        if node.next_nodes().is_empty() {
            leaf_count += 1;
        }
        total_children += node.next_nodes().len();
        total_matches += node.matches().len();
    }

    TreeMetrics {
        node_count: tree.len(),
        max_depth: depth.iter().copied().max().unwrap_or(0),
        leaf_count,
        avg_children: total_children as f64 / tree.len() as f64,
        total_matches,
    }
}
