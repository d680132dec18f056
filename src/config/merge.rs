//! Deep merge of layered environment configs.
//!
//! Objects merge key by key; arrays and scalars from the higher tier replace
//! the lower tier's value outright. Merging happens in place, so a key keeps
//! the position it had in the lowest tier that defined it.

use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Top-level key a shared env file may wrap its settings in.
pub const SHARED_KEY: &str = "shared";

/// Merge `overlay` into `base`; `overlay` wins.
///
/// Returns how many non-null values of `base` were overridden. A null
/// overlay means "not specified" and leaves `base` untouched.
pub fn merge_into(base: &mut Value, overlay: Value) -> usize {
    match (base, overlay) {
        (_, Value::Null) => 0,
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut overridden = 0;
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => overridden += merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
            overridden
        }
        (base, overlay) => {
            let overridden = usize::from(!base.is_null());
            *base = overlay;
            overridden
        }
    }
}

/// Merge `overlay` onto `base` by value; see [`merge_into`].
///
/// # Example
/// ```
/// use serde_json::json;
/// use contest_env::config::deep_merge;
///
/// let shared = json!({"python": {"timeout": 5, "run_command": "python3 {src}"}});
/// let language = json!({"python": {"timeout": 10}});
/// assert_eq!(
///     deep_merge(shared, language),
///     json!({"python": {"timeout": 10, "run_command": "python3 {src}"}})
/// );
/// ```
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

/// Merge values given lowest priority first.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

/// Merge labelled tiers, lowest priority first, logging what each tier overrode.
pub fn merge_tiers<L: fmt::Display>(tiers: impl IntoIterator<Item = (L, Value)>) -> Value {
    let mut merged = Value::Null;
    for (tier, value) in tiers {
        if value.is_null() {
            debug!(%tier, "Config tier empty");
            continue;
        }
        let overridden = merge_into(&mut merged, value);
        debug!(%tier, overridden, "Merged config tier");
    }
    merged
}

/// Unwrap a shared env file written as `{"shared": {...}}`.
pub fn normalize_shared(config: Value) -> Value {
    match config {
        Value::Object(mut map) if map.get(SHARED_KEY).is_some_and(Value::is_object) => {
            map.remove(SHARED_KEY).unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_language_overrides_shared_field_by_field() {
        let shared = json!({
            "paths": {"local_workspace_path": "./workspace", "contest_stock_path": "./stock"},
            "timeout": 5
        });
        let language = json!({"paths": {"contest_stock_path": "./py_stock"}});
        assert_eq!(
            deep_merge(shared, language),
            json!({
                "paths": {"local_workspace_path": "./workspace", "contest_stock_path": "./py_stock"},
                "timeout": 5
            })
        );
    }

    #[test]
    fn test_steps_arrays_replaced() {
        let base = json!({"commands": {"run": {"steps": ["build", "run"]}}});
        let overlay = json!({"commands": {"run": {"steps": ["run"]}}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"commands": {"run": {"steps": ["run"]}}})
        );
    }

    #[test]
    fn test_null_overlay_keeps_base() {
        let base = json!({"debug": true, "docker": {"image": "python:3.12"}});
        let overlay = json!({"debug": null, "docker": {"image": null}});
        assert_eq!(deep_merge(base.clone(), overlay), base);
    }

    #[test]
    fn test_scalar_and_object_replace_each_other() {
        assert_eq!(
            deep_merge(json!({"timeout": 5}), json!({"timeout": {"default": 7}})),
            json!({"timeout": {"default": 7}})
        );
        assert_eq!(
            deep_merge(json!({"timeout": {"default": 7}}), json!({"timeout": 3})),
            json!({"timeout": 3})
        );
    }

    #[test]
    fn test_merge_all_in_tier_order() {
        let merged = deep_merge_all(vec![
            json!({"language_id": "system", "a": 1}),
            json!({"language_id": "shared"}),
            json!({"language_id": "python", "b": 2}),
        ]);
        assert_eq!(merged, json!({"language_id": "python", "a": 1, "b": 2}));
    }

    #[test]
    fn test_merge_all_of_nothing_is_null() {
        assert_eq!(deep_merge_all(Vec::new()), Value::Null);
    }

    #[test]
    fn test_merge_into_counts_overrides() {
        let mut base = json!({
            "timeout": 5,
            "debug": null,
            "docker": {"image": "python:3.12", "memory": "256m"}
        });
        let overridden = merge_into(
            &mut base,
            json!({"timeout": 10, "debug": true, "docker": {"image": "pypy:3"}, "new": 1}),
        );
        // timeout and docker.image; debug was null and "new" was absent
        assert_eq!(overridden, 2);
        assert_eq!(
            base,
            json!({
                "timeout": 10,
                "debug": true,
                "docker": {"image": "pypy:3", "memory": "256m"},
                "new": 1
            })
        );
    }

    #[test]
    fn test_overridden_key_keeps_its_position() {
        let merged = deep_merge(
            json!({"a": 1, "b": 2, "c": 3}),
            json!({"d": 4, "a": 10}),
        );
        let keys: Vec<&str> = merged.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
        assert_eq!(merged["a"], json!(10));
    }

    #[test]
    fn test_merge_tiers_skips_empty_tiers() {
        let merged = merge_tiers(vec![
            ("system", json!({"timeout": 5, "language_id": "system"})),
            ("shared", Value::Null),
            ("language", json!({"language_id": "python"})),
            ("runtime", json!({"timeout": 30})),
        ]);
        assert_eq!(merged, json!({"timeout": 30, "language_id": "python"}));
        assert_eq!(merge_tiers(vec![("system", Value::Null)]), Value::Null);
    }

    #[test]
    fn test_normalize_shared() {
        assert_eq!(
            normalize_shared(json!({"shared": {"timeout": 5}, "ignored": 1})),
            json!({"timeout": 5})
        );
        assert_eq!(normalize_shared(json!({"timeout": 5})), json!({"timeout": 5}));
        assert_eq!(normalize_shared(json!({"shared": "flat"})), json!({"shared": "flat"}));
    }
}
