//! Hierarchical configuration resolution engine.
//!
//! A merged JSON mapping is turned into a [`ConfigTree`] once per load. The
//! tree is then only read:
//!
//! - [`resolve_by_match_desc`] ranks every node reachable by a path query,
//!   most specific first, so language-specific blocks beat shared defaults.
//! - [`resolve_formatted_string`] and [`resolve_format_string`] fill `{key}`
//!   placeholders, falling back to a breadth-first search of the tree for
//!   nodes whose key names a missing placeholder.
//!
//! Rebuilding after a config change produces a new tree; callers swap the
//! reference instead of editing a tree in place.

mod build;
mod diagnostics;
mod interpolate;
mod node;
mod path;

pub use build::{ALIASES_KEY, build_tree};
pub use diagnostics::{TreeMetrics, tree_metrics, validate_tree};
pub use interpolate::{
    resolve_format_string, resolve_formatted_string, resolve_formatted_string_with_missing,
};
pub use node::{ConfigNode, ConfigTree, NodeId, NodeKey, ROOT_KEY, render_value, value_kind};
pub use path::{resolve_best, resolve_by_match_desc, resolve_values};
