//! Layered environment configuration.
//!
//! Merges configuration from four tiers, lowest priority first:
//! 1. **System** - `<system_dir>/*.json` and `config.yaml`
//! 2. **Shared** - `<env_dir>/shared/env.json` (fallback `<env_dir>/env.json`)
//! 3. **Language** - `<env_dir>/<language>/env.json` (fallback `<env_dir>/<language>.json`)
//! 4. **Runtime** - values supplied by the caller
//!
//! ## Environment Variables
//! - `CONTEST_ENV_SYSTEM_DIR` - System config directory (default: `./config/system`)
//! - `CONTEST_ENV_ENV_DIR` - Contest env directory (default: `./contest_env`)
//! - `CONTEST_ENV_LANGUAGE` - Language used when none is given

mod loader;
mod merge;

pub use loader::{
    ConfigPaths, ConfigTier, ENV_FILE, EnvLoader, SHARED_DIR, SYSTEM_FILES, SYSTEM_YAML,
    read_runtime_file,
};
pub use merge::{SHARED_KEY, deep_merge, deep_merge_all, merge_into, merge_tiers, normalize_shared};
