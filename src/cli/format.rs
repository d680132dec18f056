//! Format subcommand for contest-env CLI

use clap::Args;
use std::collections::HashMap;

/// Arguments for the format subcommand
#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Template, e.g. `{workspace}/{contest_name}/{problem_name}`
    pub template: String,

    /// Value for a placeholder, as key=value (repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub values: Vec<(String, String)>,

    /// Fail when the template has stray braces or unknown placeholders
    #[arg(long)]
    pub strict: bool,
}

impl FormatArgs {
    /// The `--set` pairs as a map; later pairs win.
    pub fn context(&self) -> HashMap<String, String> {
        self.values.iter().cloned().collect()
    }
}

/// Parse `key=value`. The value may itself contain `=`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("contest_name=abc300").unwrap(),
            ("contest_name".to_string(), "abc300".to_string())
        );
        assert_eq!(
            parse_key_value("cmd=a=b").unwrap(),
            ("cmd".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_context_later_wins() {
        let args = FormatArgs {
            template: "{a}".into(),
            values: vec![("a".into(), "1".into()), ("a".into(), "2".into())],
            strict: false,
        };
        assert_eq!(args.context()["a"], "2");
    }
}
