//! contest-env
//!
//! Resolves competitive-programming environment settings from layered
//! JSON/YAML config files.

use anyhow::{Context, Result, bail};
use clap::Parser;
use contest_env::cli::exec::ExecConfigArgs;
use contest_env::cli::format::FormatArgs;
use contest_env::cli::{Cli, Command, OutputFormat};
use contest_env::config::{ConfigPaths, EnvLoader, read_runtime_file};
use contest_env::error::ConfigError;
use contest_env::logging::{LogTarget, init_logging};
use contest_env::manager::ConfigManager;
use contest_env::resolver::{render_value, resolve_by_match_desc, tree_metrics, validate_tree};
use serde_json::{Value, json};
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LogTarget::parse(&cli.log), cli.verbose) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ConfigError>() {
                Some(config_error) => match serde_json::to_string(&config_error.to_report()) {
                    Ok(report) => eprintln!("{}", report),
                    Err(_) => eprintln!("Error: {}", config_error),
                },
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// CLI flags override the discovered directories.
fn config_paths(cli: &Cli) -> ConfigPaths {
    let mut paths = ConfigPaths::discover();
    if let Some(dir) = &cli.system_dir {
        paths.system_dir = dir.into();
    }
    if let Some(dir) = &cli.env_dir {
        paths.env_dir = dir.into();
    }
    paths
}

fn selected_language(cli: &Cli) -> Result<String> {
    match cli.language.clone().or_else(ConfigPaths::default_language) {
        Some(language) => Ok(language),
        None => bail!("no language selected; pass --language or set CONTEST_ENV_LANGUAGE"),
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = config_paths(&cli);
    debug!(
        system_dir = %paths.system_dir.display(),
        env_dir = %paths.env_dir.display(),
        "Using config directories"
    );

    if let Command::Languages = cli.command {
        let languages = EnvLoader::new(paths).available_languages();
        return print_output(cli.format, &json!(languages), || languages.join("\n"));
    }

    let language = selected_language(&cli)?;
    let runtime = match &cli.runtime {
        Some(file) => Some(read_runtime_file(Path::new(file))?),
        None => None,
    };
    let manager = ConfigManager::new(paths);
    manager.load_with_runtime(&language, runtime)?;

    match &cli.command {
        Command::Resolve { path, all } => run_resolve(&manager, cli.format, path, *all),
        Command::Format(args) => run_format(&manager, cli.format, args),
        Command::ExecConfig(args) => run_exec_config(&manager, cli.format, &language, args),
        Command::Steps { command } => {
            let steps = manager.command_steps(&language, command)?;
            print_output(cli.format, &Value::Array(steps.clone()), || {
                steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| format!("{}. {}", i + 1, render_value(step)))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Command::Check => run_check(&manager, cli.format),
        Command::Languages => Ok(()),
    }
}

fn print_output(format: OutputFormat, value: &Value, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => {
            let text = text();
            if !text.is_empty() {
                println!("{}", text);
            }
        }
    }
    Ok(())
}

fn run_resolve(manager: &ConfigManager, format: OutputFormat, path: &[String], all: bool) -> Result<()> {
    let snapshot = manager.snapshot()?;
    let tree = &snapshot.tree;
    let mut ranked = resolve_by_match_desc(tree, path);
    if ranked.is_empty() {
        return Err(ConfigError::no_match(path).into());
    }
    if !all {
        ranked.truncate(1);
    }

    let values: Vec<&Value> = ranked.iter().map(|&id| tree.value(id)).collect();
    let json = if all {
        json!(values)
    } else {
        values[0].clone()
    };
    print_output(format, &json, || {
        if all {
            ranked
                .iter()
                .map(|&id| format!("{}: {}", tree[id].key(), render_value(tree.value(id))))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            render_value(values[0])
        }
    })
}

fn run_format(manager: &ConfigManager, format: OutputFormat, args: &FormatArgs) -> Result<()> {
    let context = args.context();
    if args.strict {
        manager.validate_template(&args.template, &context)?;
    }
    let expanded = manager.resolve_template(&args.template, &context)?;
    let missing = manager.missing_template_keys(&args.template, &context)?;
    let json = json!({"result": expanded, "missing_keys": missing});
    print_output(format, &json, || {
        if missing.is_empty() {
            expanded.clone()
        } else {
            format!("{}\n(missing: {})", expanded, missing.join(", "))
        }
    })
}

fn run_exec_config(
    manager: &ConfigManager,
    format: OutputFormat,
    language: &str,
    args: &ExecConfigArgs,
) -> Result<()> {
    let config = manager
        .execution_config(
            &args.contest,
            &args.problem,
            language,
            &args.env_type,
            &args.command_type,
        )
        .with_context(|| format!("building execution config for {}/{}", args.contest, args.problem))?;
    if let Some(template) = &args.template {
        let expanded = manager.format_for(&config, template)?;
        return print_output(format, &json!({"result": expanded}), || expanded.clone());
    }

    let json = serde_json::to_value(&config)?;
    print_output(format, &json, || {
        let Value::Object(fields) = &json else {
            return String::new();
        };
        fields
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn run_check(manager: &ConfigManager, format: OutputFormat) -> Result<()> {
    let snapshot = manager.snapshot()?;
    let issues = validate_tree(&snapshot.tree);
    let metrics = tree_metrics(&snapshot.tree);
    let json = json!({
        "language": snapshot.language,
        "issues": issues,
        "metrics": metrics,
    });
    print_output(format, &json, || {
        let mut lines = vec![
            format!("Language: {}", snapshot.language),
            format!(
                "Nodes: {}  Leaves: {}  Max depth: {}  Avg children: {:.2}  Match tokens: {}",
                metrics.node_count,
                metrics.leaf_count,
                metrics.max_depth,
                metrics.avg_children,
                metrics.total_matches
            ),
        ];
        if issues.is_empty() {
            lines.push("No issues found.".to_string());
        } else {
            lines.push(format!("Issues ({}):", issues.len()));
            lines.extend(issues.iter().map(|issue| format!("  - {}", issue)));
        }
        lines.join("\n")
    })?;
    if !issues.is_empty() {
        bail!("config tree has {} issue(s)", issues.len());
    }
    Ok(())
}
