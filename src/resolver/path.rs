//! Path Resolver: ranked best-match search over a [`ConfigTree`].

use super::node::{ConfigTree, NodeId};
use crate::error::{ConfigError, ConfigResult, format_path};
use serde_json::Value;
use tracing::debug;

/// Weight of a match at position `i` of the remaining path.
///
/// Exponential so that one match on an earlier segment outranks any number
/// of matches on later ones.
fn rank_bonus(path_len: usize, i: usize) -> u128 {
    u32::try_from(path_len - i)
        .ok()
        .and_then(|shift| 1u128.checked_shl(shift))
        .unwrap_or(u128::MAX)
}

/// Every node matching `path`, most specific first.
///
/// The search walks the tree with a LIFO stack of `(remaining path, rank,
/// node)`. A child whose match set contains segment `i` of the remaining
/// path is recorded as a candidate and searched further with the path
/// advanced past that segment; a child matching nothing is still searched
/// with the path unchanged. Candidates are sorted by rank, descending, with
/// ties kept in discovery order. A node may appear more than once when it
/// matches several segments.
pub fn resolve_by_match_desc(tree: &ConfigTree, path: &[impl AsRef<str>]) -> Vec<NodeId> {
    let path: Vec<&str> = path.iter().map(|p| p.as_ref()).collect();
    if path.is_empty() {
        return Vec::new();
    }

    let total = path.len();
    let mut candidates: Vec<(u128, NodeId)> = Vec::new();
    let mut visited = vec![false; tree.len()];
    // (offset of the remaining path, rank so far, node)
    let mut stack: Vec<(usize, u128, NodeId)> = vec![(0, 1, tree.root())];

    while let Some((offset, rank, id)) = stack.pop() {
        if std::mem::replace(&mut visited[id.index()], true) {
            continue;
        }

        let remaining = &path[offset..];
        for &child in tree[id].next_nodes() {
            let mut matched = false;
            for (i, token) in remaining.iter().enumerate() {
                if tree[child].is_match(token) {
                    matched = true;
                    let child_rank = rank.saturating_add(rank_bonus(total, i));
                    stack.push((offset + i + 1, child_rank, child));
                    candidates.push((child_rank, child));
                }
            }
            if !matched {
                stack.push((offset, rank, child));
            }
        }
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    debug!(path = %format_path(&path[..]), candidates = candidates.len(), "Resolved config path");
    candidates.into_iter().map(|(_, id)| id).collect()
}

/// The highest-ranked node for `path`.
pub fn resolve_best(tree: &ConfigTree, path: &[impl AsRef<str>]) -> ConfigResult<NodeId> {
    resolve_by_match_desc(tree, path)
        .into_iter()
        .next()
        .ok_or_else(|| ConfigError::no_match(path))
}

/// Values of every ranked match, in rank order.
pub fn resolve_values<'t>(tree: &'t ConfigTree, path: &[impl AsRef<str>]) -> Vec<&'t Value> {
    resolve_by_match_desc(tree, path)
        .into_iter()
        .map(|id| tree.value(id))
        .collect()
}
