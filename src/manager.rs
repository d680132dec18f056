//! Config manager: owns the current tree and answers typed lookups.
//!
//! Each load produces a [`LoadedConfig`] snapshot that carries the tree
//! together with its lookup caches. The manager holds the active snapshot
//! behind an [`ArcSwapOption`]; reloading builds a complete new snapshot and
//! swaps it in, so readers holding the previous one are never disturbed and
//! never see results computed against another tree.

use crate::config::{ConfigPaths, EnvLoader};
use crate::error::{ConfigError, ConfigResult, format_path};
use crate::format::{KeyCache, validate_template};
use crate::resolver::{
    ConfigTree, build_tree, render_value, resolve_best, resolve_formatted_string_with_missing,
    value_kind,
};
use crate::sync::lock;
use arc_swap::ArcSwapOption;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Candidate paths for the workspace directory, tried in order.
const WORKSPACE_PATHS: &[&[&str]] = &[
    &["paths", "local_workspace_path"],
    &["workspace"],
    &["local_workspace_path"],
    &["base_path"],
];

/// Execution configs kept per snapshot before the oldest is evicted.
pub const EXECUTION_CACHE_LIMIT: usize = 1000;

/// Conversion from a resolved JSON value into a Rust type.
pub trait FromConfigValue: Sized {
    /// Type name used in mismatch errors.
    const EXPECTED: &'static str;

    fn from_config_value(value: &Value) -> Option<Self>;
}

impl FromConfigValue for String {
    const EXPECTED: &'static str = "string";

    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Some(render_value(value)),
            _ => None,
        }
    }
}

impl FromConfigValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromConfigValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromConfigValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromConfigValue for PathBuf {
    const EXPECTED: &'static str = "path";

    fn from_config_value(value: &Value) -> Option<Self> {
        value.as_str().map(PathBuf::from)
    }
}

impl FromConfigValue for Value {
    const EXPECTED: &'static str = "any value";

    fn from_config_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

/// Everything needed to run one command for one problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionConfig {
    pub contest_name: String,
    pub problem_name: String,
    pub language: String,
    pub env_type: String,
    pub command_type: String,
    pub workspace_path: PathBuf,
    pub contest_current_path: PathBuf,
    pub contest_stock_path: PathBuf,
    pub contest_template_path: PathBuf,
    pub contest_temp_path: PathBuf,
    pub timeout_seconds: i64,
    pub language_id: String,
    pub source_file_name: String,
    pub run_command: String,
    pub debug: bool,
}

impl ExecutionConfig {
    /// Placeholder values this config supplies to templates.
    pub fn context(&self) -> HashMap<String, String> {
        let paths = [
            ("workspace", &self.workspace_path),
            ("local_workspace_path", &self.workspace_path),
            ("contest_current_path", &self.contest_current_path),
            ("contest_stock_path", &self.contest_stock_path),
            ("contest_template_path", &self.contest_template_path),
            ("contest_temp_path", &self.contest_temp_path),
        ];
        let fields = [
            ("contest_name", self.contest_name.clone()),
            ("problem_name", self.problem_name.clone()),
            ("language", self.language.clone()),
            ("language_name", self.language.clone()),
            ("env_type", self.env_type.clone()),
            ("command_type", self.command_type.clone()),
            ("timeout_seconds", self.timeout_seconds.to_string()),
            ("language_id", self.language_id.clone()),
            ("source_file_name", self.source_file_name.clone()),
            ("run_command", self.run_command.clone()),
        ];

        paths
            .into_iter()
            .map(|(k, p)| (k, p.display().to_string()))
            .chain(fields)
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Reject configs missing the names every command needs.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("contest name", &self.contest_name),
            ("problem name", &self.problem_name),
            ("language", &self.language),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

type ExecutionKey = (String, String, String, String, String);
type TemplateKey = (String, Vec<(String, String)>);

/// Insertion-ordered execution config cache with a size bound.
#[derive(Debug, Default)]
struct ExecutionCache {
    entries: HashMap<ExecutionKey, ExecutionConfig>,
    order: VecDeque<ExecutionKey>,
}

impl ExecutionCache {
    fn get(&self, key: &ExecutionKey) -> Option<ExecutionConfig> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: ExecutionKey, config: ExecutionConfig) {
        if self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= EXECUTION_CACHE_LIMIT {
            let Some(oldest) = self.order.pop_front() else { break };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, config);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A built tree, what it was built from, and the caches computed against it.
pub struct LoadedConfig {
    pub language: String,
    pub tree: ConfigTree,
    runtime: Option<Value>,
    values: Mutex<HashMap<Vec<String>, Value>>,
    templates: Mutex<HashMap<TemplateKey, (String, Vec<String>)>>,
    executions: Mutex<ExecutionCache>,
    keys: KeyCache,
}

impl fmt::Debug for LoadedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedConfig")
            .field("language", &self.language)
            .field("nodes", &self.tree.len())
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl LoadedConfig {
    fn new(language: String, tree: ConfigTree, runtime: Option<Value>) -> Self {
        Self {
            language,
            tree,
            runtime,
            values: Mutex::new(HashMap::new()),
            templates: Mutex::new(HashMap::new()),
            executions: Mutex::new(ExecutionCache::default()),
            keys: KeyCache::new(),
        }
    }

    /// Value of the best match for `path` in this snapshot.
    pub fn best_value(&self, path: &[&str]) -> ConfigResult<Value> {
        let cache_key: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        if let Some(value) = lock(&self.values).get(&cache_key) {
            return Ok(value.clone());
        }

        let best = resolve_best(&self.tree, path)?;
        let value = self.tree.value(best).clone();
        lock(&self.values).insert(cache_key, value.clone());
        Ok(value)
    }

    /// Value of the best match for `path`, converted to `T`.
    pub fn resolve_config<T: FromConfigValue>(&self, path: &[&str]) -> ConfigResult<T> {
        let value = self.best_value(path)?;
        T::from_config_value(&value)
            .ok_or_else(|| ConfigError::type_mismatch(path, T::EXPECTED, value_kind(&value)))
    }

    /// Best match for `path`, which must be an array; each item converted.
    pub fn resolve_config_list<T: FromConfigValue>(&self, path: &[&str]) -> ConfigResult<Vec<T>> {
        let value = self.best_value(path)?;
        let Value::Array(items) = &value else {
            return Err(ConfigError::type_mismatch(path, "array", value_kind(&value)));
        };
        items
            .iter()
            .map(|item| {
                T::from_config_value(item)
                    .ok_or_else(|| ConfigError::type_mismatch(path, T::EXPECTED, value_kind(item)))
            })
            .collect()
    }

    /// First of `paths` that resolves and converts to `T`.
    pub fn resolve_first<T: FromConfigValue>(&self, paths: &[&[&str]]) -> ConfigResult<T> {
        for path in paths {
            match self.resolve_config(path) {
                Ok(value) => return Ok(value),
                Err(e) => debug!(path = %format_path(*path), error = %e, "Fallback path skipped"),
            }
        }
        let tried: Vec<String> = paths.iter().map(|p| format_path(*p)).collect();
        Err(ConfigError::NoMatch {
            path: tried.join(" | "),
        })
    }

    /// [`resolve_config`](Self::resolve_config), then `check` must accept the
    /// value. `message` replaces the default validation message.
    pub fn resolve_config_validated<T, F>(
        &self,
        path: &[&str],
        check: F,
        message: Option<&str>,
    ) -> ConfigResult<T>
    where
        T: FromConfigValue + fmt::Debug,
        F: FnOnce(&T) -> bool,
    {
        let value: T = self.resolve_config(path)?;
        if check(&value) {
            return Ok(value);
        }
        Err(ConfigError::validation(match message {
            Some(message) => message.to_string(),
            None => format!("validation failed for {}: {:?}", format_path(path), value),
        }))
    }

    /// Expanded template and the placeholders nothing could supply.
    fn expand(
        &self,
        template: &str,
        context: &HashMap<String, String>,
    ) -> (String, Vec<String>) {
        // Only context entries the template names can change the result.
        let keys = self.keys.keys(template);
        let mut pairs: Vec<(String, String)> = context
            .iter()
            .filter(|(k, _)| keys.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        let cache_key = (template.to_string(), pairs);
        if let Some(hit) = lock(&self.templates).get(&cache_key) {
            return hit.clone();
        }

        let expanded = resolve_formatted_string_with_missing(template, &self.tree, context);
        lock(&self.templates).insert(cache_key, expanded.clone());
        expanded
    }

    /// Fill `{key}` placeholders from `context`, then from the tree.
    pub fn resolve_template(&self, template: &str, context: &HashMap<String, String>) -> String {
        self.expand(template, context).0
    }

    /// Placeholders of `template` left unfilled by
    /// [`resolve_template`](Self::resolve_template).
    pub fn missing_template_keys(
        &self,
        template: &str,
        context: &HashMap<String, String>,
    ) -> Vec<String> {
        self.expand(template, context).1
    }

    /// Reject templates with stray braces or placeholders that stay unfilled.
    pub fn validate_template(
        &self,
        template: &str,
        context: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        let problems = validate_template(template);
        if !problems.is_empty() {
            return Err(ConfigError::validation(format!(
                "template validation failed: {}",
                problems.join("; ")
            )));
        }
        let missing = self.missing_template_keys(template, context);
        if !missing.is_empty() {
            return Err(ConfigError::validation(format!(
                "template validation failed: unknown keys {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Workflow steps `language` defines for `command`.
    pub fn command_steps(&self, language: &str, command: &str) -> ConfigResult<Vec<Value>> {
        self.resolve_config_list(&[language, "commands", command, "steps"])
    }

    /// Build the [`ExecutionConfig`] for one problem, reusing a cached one
    /// for the same arguments.
    pub fn execution_config(
        &self,
        contest_name: &str,
        problem_name: &str,
        language: &str,
        env_type: &str,
        command_type: &str,
    ) -> ConfigResult<ExecutionConfig> {
        let cache_key: ExecutionKey = (
            contest_name.to_string(),
            problem_name.to_string(),
            language.to_string(),
            env_type.to_string(),
            command_type.to_string(),
        );
        if let Some(hit) = lock(&self.executions).get(&cache_key) {
            return Ok(hit);
        }

        let config =
            self.build_execution_config(contest_name, problem_name, language, env_type, command_type)?;
        config.validate()?;
        lock(&self.executions).insert(cache_key, config.clone());
        Ok(config)
    }

    fn build_execution_config(
        &self,
        contest_name: &str,
        problem_name: &str,
        language: &str,
        env_type: &str,
        command_type: &str,
    ) -> ConfigResult<ExecutionConfig> {
        let workspace: String = self.resolve_first(WORKSPACE_PATHS)?;
        let context: HashMap<String, String> = [
            ("contest_name", contest_name),
            ("problem_name", problem_name),
            ("language", language),
            ("language_name", language),
            ("env_type", env_type),
            ("command_type", command_type),
            ("workspace", workspace.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let contest_path = |key: &str| -> ConfigResult<PathBuf> {
            let template: String = self.resolve_config(&["paths", key])?;
            Ok(PathBuf::from(self.resolve_template(&template, &context)))
        };

        let timeout_paths: [&[&str]; 5] = [
            &["timeout", "default"],
            &["timeout"],
            &["default_timeout"],
            &[language, "timeout"],
            &["shared", "timeout"],
        ];
        let debug_paths: [&[&str]; 3] = [&["debug"], &["shared", "debug"], &[language, "debug"]];

        Ok(ExecutionConfig {
            contest_name: contest_name.to_string(),
            problem_name: problem_name.to_string(),
            language: language.to_string(),
            env_type: env_type.to_string(),
            command_type: command_type.to_string(),
            workspace_path: PathBuf::from(self.resolve_template("{workspace}", &context)),
            contest_current_path: contest_path("contest_current_path")?,
            contest_stock_path: contest_path("contest_stock_path")?,
            contest_template_path: contest_path("contest_template_path")?,
            contest_temp_path: contest_path("contest_temp_path")?,
            timeout_seconds: self.resolve_first(&timeout_paths)?,
            language_id: self.resolve_config(&[language, "language_id"])?,
            source_file_name: self.resolve_config(&[language, "source_file_name"])?,
            run_command: self.resolve_config(&[language, "run_command"])?,
            debug: self.resolve_first(&debug_paths).unwrap_or(false),
        })
    }

    /// Fill `template` with `execution`'s values, then from the tree.
    pub fn format_for(&self, execution: &ExecutionConfig, template: &str) -> String {
        self.resolve_template(template, &execution.context())
    }

    fn cached_executions(&self) -> usize {
        lock(&self.executions).len()
    }
}

/// Owns the active config snapshot.
#[derive(Debug)]
pub struct ConfigManager {
    loader: Option<EnvLoader>,
    current: ArcSwapOption<LoadedConfig>,
}

impl ConfigManager {
    /// Manager reading from the given directories. Nothing is loaded yet.
    pub fn new(paths: ConfigPaths) -> Self {
        Self {
            loader: Some(EnvLoader::new(paths)),
            current: ArcSwapOption::empty(),
        }
    }

    /// Manager over an already merged mapping, with no backing files.
    pub fn from_value(language: impl Into<String>, data: &Value) -> ConfigResult<Self> {
        let manager = Self {
            loader: None,
            current: ArcSwapOption::empty(),
        };
        manager.install(language.into(), build_tree(data)?, None);
        Ok(manager)
    }

    /// Load and merge the files for `language`, then build the tree.
    pub fn load(&self, language: &str) -> ConfigResult<()> {
        self.load_with_runtime(language, None)
    }

    /// Like [`load`](Self::load), with runtime values merged on top.
    pub fn load_with_runtime(&self, language: &str, runtime: Option<Value>) -> ConfigResult<()> {
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| ConfigError::validation("config manager has no config directories"))?;
        let merged = loader.load_and_merge(language, runtime.clone())?;
        let tree = build_tree(&merged)?;
        self.install(language.to_string(), tree, runtime);
        Ok(())
    }

    /// Rebuild for another language, reusing the runtime values of the
    /// current load. Requires a previous load.
    pub fn reload_with_language(&self, language: &str) -> ConfigResult<()> {
        let current = self.snapshot()?;
        self.load_with_runtime(language, current.runtime.clone())?;
        info!(from = %current.language, to = %language, "Reloaded config for language");
        Ok(())
    }

    fn install(&self, language: String, tree: ConfigTree, runtime: Option<Value>) {
        debug!(language = %language, nodes = tree.len(), "Installing config tree");
        self.current
            .store(Some(Arc::new(LoadedConfig::new(language, tree, runtime))));
    }

    /// The active snapshot.
    pub fn snapshot(&self) -> ConfigResult<Arc<LoadedConfig>> {
        self.current.load_full().ok_or(ConfigError::NotLoaded)
    }

    pub fn language(&self) -> ConfigResult<String> {
        Ok(self.snapshot()?.language.clone())
    }

    pub fn loader(&self) -> Option<&EnvLoader> {
        self.loader.as_ref()
    }

    /// See [`LoadedConfig::resolve_config`].
    pub fn resolve_config<T: FromConfigValue>(&self, path: &[&str]) -> ConfigResult<T> {
        self.snapshot()?.resolve_config(path)
    }

    pub fn resolve_config_list<T: FromConfigValue>(&self, path: &[&str]) -> ConfigResult<Vec<T>> {
        self.snapshot()?.resolve_config_list(path)
    }

    pub fn resolve_first<T: FromConfigValue>(&self, paths: &[&[&str]]) -> ConfigResult<T> {
        self.snapshot()?.resolve_first(paths)
    }

    /// See [`LoadedConfig::resolve_config_validated`].
    pub fn resolve_config_validated<T, F>(
        &self,
        path: &[&str],
        check: F,
        message: Option<&str>,
    ) -> ConfigResult<T>
    where
        T: FromConfigValue + fmt::Debug,
        F: FnOnce(&T) -> bool,
    {
        self.snapshot()?.resolve_config_validated(path, check, message)
    }

    pub fn resolve_template(
        &self,
        template: &str,
        context: &HashMap<String, String>,
    ) -> ConfigResult<String> {
        Ok(self.snapshot()?.resolve_template(template, context))
    }

    pub fn resolve_template_to_path(
        &self,
        template: &str,
        context: &HashMap<String, String>,
    ) -> ConfigResult<PathBuf> {
        self.resolve_template(template, context).map(PathBuf::from)
    }

    pub fn missing_template_keys(
        &self,
        template: &str,
        context: &HashMap<String, String>,
    ) -> ConfigResult<Vec<String>> {
        Ok(self.snapshot()?.missing_template_keys(template, context))
    }

    pub fn validate_template(
        &self,
        template: &str,
        context: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        self.snapshot()?.validate_template(template, context)
    }

    pub fn command_steps(&self, language: &str, command: &str) -> ConfigResult<Vec<Value>> {
        self.snapshot()?.command_steps(language, command)
    }

    /// See [`LoadedConfig::execution_config`]. The whole config is built
    /// from one snapshot.
    pub fn execution_config(
        &self,
        contest_name: &str,
        problem_name: &str,
        language: &str,
        env_type: &str,
        command_type: &str,
    ) -> ConfigResult<ExecutionConfig> {
        self.snapshot()?
            .execution_config(contest_name, problem_name, language, env_type, command_type)
    }

    pub fn format_for(&self, execution: &ExecutionConfig, template: &str) -> ConfigResult<String> {
        Ok(self.snapshot()?.format_for(execution, template))
    }
}
