//! contest-env library
//!
//! Layered config loading plus a match-ranked resolver for
//! competitive-programming environments. The binary in `main.rs` is a thin
//! CLI over [`manager::ConfigManager`].

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod manager;
pub mod resolver;

mod sync;
