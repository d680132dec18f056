//! Integration tests for ConfigManager over real config directories.
//!
//! Each test lays out a system dir and an env dir under a TempDir and
//! drives the manager through load, lookup and reload.

use contest_env::config::ConfigPaths;
use contest_env::error::{ConfigError, ErrorCode};
use contest_env::manager::ConfigManager;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Lay out a two-language contest environment and return its paths.
fn contest_env(temp: &TempDir) -> ConfigPaths {
    let system = temp.path().join("system");
    let env = temp.path().join("contest_env");

    write(&system.join("timeout.json"), r#"{"timeout": {"default": 10}}"#);
    write(
        &system.join("config.yaml"),
        "debug: false\nlocal_workspace_path: ./workspace\n",
    );
    write(
        &env.join("shared/env.json"),
        r#"{
            "shared": {
                "paths": {
                    "local_workspace_path": "/work",
                    "contest_current_path": "{workspace}/contest_current",
                    "contest_stock_path": "{workspace}/contest_stock/{language_name}/{contest_name}/{problem_name}",
                    "contest_template_path": "{workspace}/contest_template/{language_name}",
                    "contest_temp_path": "{workspace}/.temp"
                },
                "commands": {"run": {"steps": [{"type": "shell", "cmd": ["echo", "shared"]}]}}
            }
        }"#,
    );
    write(
        &env.join("python/env.json"),
        r#"{
            "python": {
                "aliases": ["py"],
                "language_id": "5078",
                "source_file_name": "main.py",
                "run_command": "python3",
                "timeout": 4,
                "commands": {
                    "run": {"steps": [{"type": "shell", "cmd": ["python3", "{source_file_name}"]}]}
                }
            }
        }"#,
    );
    write(
        &env.join("cpp/env.json"),
        r#"{
            "cpp": {
                "language_id": "5001",
                "source_file_name": "main.cpp",
                "run_command": "./a.out",
                "commands": {
                    "run": {"steps": [{"type": "build"}, {"type": "shell", "cmd": ["./a.out"]}]}
                }
            }
        }"#,
    );

    ConfigPaths::with_dirs(system, env)
}

#[test]
fn test_load_and_resolve() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigManager::new(contest_env(&temp));
    manager.load("python").unwrap();

    assert_eq!(manager.language().unwrap(), "python");
    assert_eq!(
        manager
            .resolve_config::<String>(&["python", "source_file_name"])
            .unwrap(),
        "main.py"
    );
    assert_eq!(
        manager.resolve_config::<i64>(&["py", "language_id"]).unwrap(),
        5078
    );
    // cpp/env.json is not merged for a python load.
    assert!(manager.snapshot().unwrap().tree.lookup(&["cpp"]).is_none());
}

#[test]
fn test_command_steps_prefer_language() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigManager::new(contest_env(&temp));
    manager.load("python").unwrap();

    let steps = manager.command_steps("python", "run").unwrap();
    assert_eq!(
        steps,
        vec![json!({"type": "shell", "cmd": ["python3", "{source_file_name}"]})]
    );
}

#[test]
fn test_execution_config() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigManager::new(contest_env(&temp));
    manager.load("python").unwrap();

    let exec = manager
        .execution_config("abc300", "a", "python", "local", "run")
        .unwrap();
    assert_eq!(exec.workspace_path, PathBuf::from("/work"));
    assert_eq!(
        exec.contest_stock_path,
        PathBuf::from("/work/contest_stock/python/abc300/a")
    );
    assert_eq!(exec.contest_current_path, PathBuf::from("/work/contest_current"));
    assert_eq!(exec.timeout_seconds, 10);
    assert_eq!(exec.language_id, "5078");
    assert_eq!(exec.run_command, "python3");
    assert!(!exec.debug);
}

#[test]
fn test_runtime_values_and_reload() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigManager::new(contest_env(&temp));
    manager
        .load_with_runtime("python", Some(json!({"contest_name": "abc300"})))
        .unwrap();

    let ctx = HashMap::new();
    assert_eq!(
        manager.resolve_template("{contest_name}/{source_file_name}", &ctx).unwrap(),
        "abc300/main.py"
    );

    let before = manager.snapshot().unwrap();
    manager.reload_with_language("cpp").unwrap();

    // Runtime values carry over; the old snapshot stays intact.
    assert_eq!(manager.language().unwrap(), "cpp");
    assert_eq!(
        manager.resolve_template("{contest_name}/{source_file_name}", &ctx).unwrap(),
        "abc300/main.cpp"
    );
    assert_eq!(before.language, "python");
    assert!(before.tree.lookup(&["python", "source_file_name"]).is_some());
}

#[test]
fn test_concurrent_readers() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(ConfigManager::new(contest_env(&temp)));
    manager.load("cpp").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..50 {
                    let steps = manager.command_steps("cpp", "run").unwrap();
                    assert_eq!(steps.len(), 2);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_template_cache_consistent_across_reloads() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(ConfigManager::new(contest_env(&temp)));
    manager.load("python").unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let ctx = HashMap::new();
                for _ in 0..200 {
                    let snap = manager.snapshot().unwrap();
                    let expected = match snap.language.as_str() {
                        "python" => "main.py",
                        "cpp" => "main.cpp",
                        other => panic!("unexpected language {other}"),
                    };
                    assert_eq!(snap.resolve_template("{source_file_name}", &ctx), expected);
                }
            })
        })
        .collect();

    let writer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            for i in 0..40 {
                let language = if i % 2 == 0 { "cpp" } else { "python" };
                manager.reload_with_language(language).unwrap();
            }
        })
    };

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    // Last reload was python; nothing cached under cpp leaks into it.
    let ctx = HashMap::new();
    assert_eq!(manager.language().unwrap(), "python");
    assert_eq!(
        manager.resolve_template("{source_file_name}", &ctx).unwrap(),
        "main.py"
    );
    assert_eq!(
        manager
            .resolve_config::<String>(&["python", "source_file_name"])
            .unwrap(),
        "main.py"
    );
}

#[test]
fn test_error_reports() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigManager::new(contest_env(&temp));

    let err = manager.resolve_config::<String>(&["python"]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigNotLoaded);

    manager.load("python").unwrap();
    let err = manager
        .resolve_config::<String>(&["no_such_key_anywhere"])
        .unwrap_err();
    assert!(matches!(err, ConfigError::NoMatch { .. }));
    let report = serde_json::to_value(err.to_report()).unwrap();
    assert_eq!(report["code"], "CONFIG_NOT_FOUND");
    assert!(report["message"].as_str().unwrap().contains("no_such_key_anywhere"));
}

#[test]
fn test_malformed_language_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let paths = contest_env(&temp);
    write(&paths.env_dir.join("rust/env.json"), "[\"not\", \"a\", \"mapping\"]");

    let manager = ConfigManager::new(paths);
    let err = manager.load("rust").unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
    assert!(manager.snapshot().is_err());
}
