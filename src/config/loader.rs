//! Environment config loader with tier-based merging.
//!
//! Reads the system config files and the contest env files for one language
//! and merges them into the single mapping the resolver builds its tree from.

use super::merge::{merge_tiers, normalize_shared};
use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// System config files, merged in this order.
pub const SYSTEM_FILES: &[&str] = &[
    "docker_security.json",
    "docker_defaults.json",
    "file_patterns.json",
    "languages.json",
    "timeout.json",
    "config.json",
];

/// YAML system config, merged after [`SYSTEM_FILES`].
pub const SYSTEM_YAML: &str = "config.yaml";

/// Name of each env config file.
pub const ENV_FILE: &str = "env.json";

/// Env-dir subdirectory holding settings shared by every language.
pub const SHARED_DIR: &str = "shared";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// System config directory (lowest priority)
    System = 0,
    /// `shared/env.json`
    Shared = 1,
    /// `<language>/env.json`
    Language = 2,
    /// Values injected by the caller (highest priority)
    Runtime = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::System => write!(f, "system"),
            ConfigTier::Shared => write!(f, "shared"),
            ConfigTier::Language => write!(f, "language"),
            ConfigTier::Runtime => write!(f, "runtime"),
        }
    }
}

/// Directories the loader reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// System config directory
    pub system_dir: PathBuf,
    /// Contest env directory (`shared/`, `<language>/`)
    pub env_dir: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover directories from environment and defaults.
    pub fn discover() -> Self {
        // System dir: CONTEST_ENV_SYSTEM_DIR, ./config/system, or ~/.contest-env/system
        let system_dir = std::env::var("CONTEST_ENV_SYSTEM_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let local = PathBuf::from("config").join("system");
                if local.exists() {
                    return local;
                }
                dirs::home_dir()
                    .map(|h| h.join(".contest-env").join("system"))
                    .unwrap_or(local)
            });

        // Env dir: CONTEST_ENV_ENV_DIR or ./contest_env
        let env_dir = std::env::var("CONTEST_ENV_ENV_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("contest_env"));

        Self {
            system_dir,
            env_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(system_dir: impl Into<PathBuf>, env_dir: impl Into<PathBuf>) -> Self {
        Self {
            system_dir: system_dir.into(),
            env_dir: env_dir.into(),
        }
    }

    /// Language used when the caller names none.
    pub fn default_language() -> Option<String> {
        std::env::var("CONTEST_ENV_LANGUAGE")
            .ok()
            .filter(|l| !l.is_empty())
    }
}

/// Loads and merges the config tiers for a language.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    paths: ConfigPaths,
}

impl EnvLoader {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Merge system < shared < language < runtime into one mapping.
    ///
    /// Missing or unreadable files count as empty. The result is always an
    /// object; a tier that is not an object replaces the merge and is
    /// rejected here rather than in the tree builder.
    pub fn load_and_merge(&self, language: &str, runtime: Option<Value>) -> ConfigResult<Value> {
        check_language_name(language)?;
        let tiers = [
            (ConfigTier::System, self.load_system()?),
            (ConfigTier::Shared, self.load_shared()),
            (ConfigTier::Language, self.load_language(language)),
            (ConfigTier::Runtime, runtime.unwrap_or(Value::Null)),
        ];

        for (tier, value) in &tiers {
            if !(value.is_object() || value.is_null()) {
                return Err(ConfigError::validation(format!(
                    "{} config must be a JSON object",
                    tier
                )));
            }
        }

        let merged = match merge_tiers(tiers) {
            Value::Null => Value::Object(Map::new()),
            merged => merged,
        };
        info!(
            language,
            system_dir = %self.paths.system_dir.display(),
            env_dir = %self.paths.env_dir.display(),
            "Loaded environment config"
        );
        Ok(merged)
    }

    fn load_system(&self) -> ConfigResult<Value> {
        let dir = &self.paths.system_dir;
        if !dir.exists() {
            debug!(dir = %dir.display(), "System config directory missing");
            return Ok(Value::Null);
        }

        let mut files: Vec<(PathBuf, Value)> = SYSTEM_FILES
            .iter()
            .map(|name| {
                let path = dir.join(name);
                let value = read_json_file(&path);
                (path, value)
            })
            .collect();
        let yaml = dir.join(SYSTEM_YAML);
        let value = read_yaml_file(&yaml);
        files.push((yaml, value));

        // checked per file, before merging
        for (path, value) in &files {
            if !(value.is_object() || value.is_null()) {
                return Err(ConfigError::validation(format!(
                    "system config {} must be a mapping",
                    path.display()
                )));
            }
        }
        Ok(merge_tiers(
            files
                .into_iter()
                .map(|(path, value)| (path.display().to_string(), value)),
        ))
    }

    fn load_shared(&self) -> Value {
        let shared = self.paths.env_dir.join(SHARED_DIR).join(ENV_FILE);
        let config = if shared.exists() {
            read_json_file(&shared)
        } else {
            read_json_file(&self.paths.env_dir.join(ENV_FILE))
        };
        normalize_shared(config)
    }

    fn load_language(&self, language: &str) -> Value {
        let nested = self.paths.env_dir.join(language).join(ENV_FILE);
        if nested.exists() {
            read_json_file(&nested)
        } else {
            read_json_file(&self.paths.env_dir.join(format!("{}.json", language)))
        }
    }

    /// Languages with an `env.json` under the env directory, sorted.
    pub fn available_languages(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.paths.env_dir) else {
            return Vec::new();
        };

        let mut languages: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir() && entry.path().join(ENV_FILE).exists())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name != SHARED_DIR)
            .collect();
        languages.sort();
        languages
    }
}

/// Language names become directory names, so they must be a single plain
/// path component.
fn check_language_name(language: &str) -> ConfigResult<()> {
    let plain = !language.is_empty()
        && language != "."
        && language != ".."
        && !language.contains(['/', '\\'])
        && !Path::new(language).is_absolute();
    if plain {
        Ok(())
    } else {
        Err(ConfigError::validation(format!(
            "invalid language name '{}'",
            language
        )))
    }
}

/// Read caller-supplied runtime values from a JSON or YAML file.
///
/// Unlike the tier files, a runtime file is named explicitly, so read and
/// parse failures are errors. `.yaml`/`.yml` files are parsed as YAML,
/// everything else as JSON.
pub fn read_runtime_file(path: &Path) -> ConfigResult<Value> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::io(path.display(), e))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let value: Value = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    if !value.is_object() {
        return Err(ConfigError::validation(format!(
            "runtime config {} must be a mapping",
            path.display()
        )));
    }
    debug!(path = %path.display(), "Read runtime values");
    Ok(value)
}

/// Read a JSON file, treating missing or malformed files as absent.
fn read_json_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Null;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<Value>(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed JSON config");
                Value::Null
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable config");
            Value::Null
        }
    }
}

/// Read a YAML file, treating missing or malformed files as absent.
fn read_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Null;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Value>(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed YAML config");
                Value::Null
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable config");
            Value::Null
        }
    }
}
