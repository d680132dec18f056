//! `{key}` template primitives.
//!
//! Placeholders are `{identifier}` where the identifier is `[A-Za-z0-9_]+`.
//! Doubled braces (`{{`, `}}`) are escapes: they never start a placeholder and
//! render as a single brace.

use crate::sync::lock;
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([A-Za-z0-9_]+)\}").expect("valid token pattern"));

/// A lexical piece of a template.
enum Token<'a> {
    Literal(&'a str),
    OpenEscape,
    CloseEscape,
    Placeholder(&'a str),
}

fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in TOKEN_PATTERN.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            tokens.push(Token::Literal(&template[last..whole.start()]));
        }
        tokens.push(match (whole.as_str(), caps.get(1)) {
            (_, Some(name)) => Token::Placeholder(name.as_str()),
            ("{{", None) => Token::OpenEscape,
            _ => Token::CloseEscape,
        });
        last = whole.end();
    }
    if last < template.len() {
        tokens.push(Token::Literal(&template[last..]));
    }
    tokens
}

/// Placeholder names in left-to-right order, duplicates preserved.
pub fn extract_format_keys(template: &str) -> Vec<String> {
    tokenize(template)
        .into_iter()
        .filter_map(|token| match token {
            Token::Placeholder(name) => Some(name.to_string()),
            _ => None,
        })
        .collect()
}

/// Substitute every placeholder found in `values`.
///
/// Placeholders without a value stay in the output as literal `{key}` text and
/// are reported in the returned list (template order, duplicates included).
pub fn format_with_missing_keys<V: AsRef<str>>(
    template: &str,
    values: &HashMap<String, V>,
) -> (String, Vec<String>) {
    let mut out = String::with_capacity(template.len());
    let mut missing = Vec::new();

    for token in tokenize(template) {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::OpenEscape => out.push('{'),
            Token::CloseEscape => out.push('}'),
            Token::Placeholder(name) => match values.get(name) {
                Some(value) => out.push_str(value.as_ref()),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                    missing.push(name.to_string());
                }
            },
        }
    }

    (out, missing)
}

/// Check a template for stray braces and malformed placeholders.
///
/// Returns one message per problem; a well-formed template yields an empty list.
pub fn validate_template(template: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let mut offset = 0;
    for token in tokenize(template) {
        match token {
            Token::Literal(text) => {
                for (i, c) in text.char_indices() {
                    match c {
                        '{' => problems.push(format!("unmatched '{{' at byte {}", offset + i)),
                        '}' => problems.push(format!("unmatched '}}' at byte {}", offset + i)),
                        _ => {}
                    }
                }
                offset += text.len();
            }
            Token::OpenEscape | Token::CloseEscape => offset += 2,
            Token::Placeholder(name) => offset += name.len() + 2,
        }
    }
    problems
}

/// Memoizing wrapper around [`extract_format_keys`].
///
/// Owned by whoever formats repeatedly (see `ConfigManager`); there is no
/// process-wide cache.
#[derive(Debug, Default)]
pub struct KeyCache {
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of `template`, computed once per distinct template string.
    pub fn keys(&self, template: &str) -> Vec<String> {
        lock(&self.entries)
            .entry(template.to_string())
            .or_insert_with(|| extract_format_keys(template))
            .clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_keys_in_order_with_duplicates() {
        assert_eq!(
            extract_format_keys("/{a}/{b}/{a}.py"),
            vec!["a", "b", "a"]
        );
    }

    #[test]
    fn test_extract_skips_escaped_braces() {
        assert!(extract_format_keys("{{key}}").is_empty());
        assert_eq!(extract_format_keys("{{{key}}}"), vec!["key"]);
    }

    #[test]
    fn test_extract_ignores_non_identifier_content() {
        assert!(extract_format_keys("{not a key} {a-b} {}").is_empty());
    }

    #[test]
    fn test_full_fill() {
        let (out, missing) = format_with_missing_keys("/{a}/{b}", &values(&[("a", "1"), ("b", "2")]));
        assert_eq!(out, "/1/2");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_partial_fill_keeps_placeholder() {
        let (out, missing) = format_with_missing_keys("/{a}/{b}", &values(&[("a", "1")]));
        assert_eq!(out, "/1/{b}");
        assert_eq!(missing, vec!["b"]);
    }

    #[test]
    fn test_missing_duplicates_reported() {
        let (out, missing) = format_with_missing_keys("{x}-{x}", &values(&[]));
        assert_eq!(out, "{x}-{x}");
        assert_eq!(missing, vec!["x", "x"]);
    }

    #[test]
    fn test_escaped_braces_render_single() {
        let (out, missing) = format_with_missing_keys("{{a}} {a}", &values(&[("a", "v")]));
        assert_eq!(out, "{a} v");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_validate_template() {
        assert!(validate_template("/{a}/{{b}}").is_empty());
        let problems = validate_template("{a} { b");
        assert_eq!(problems, vec!["unmatched '{' at byte 4"]);
        assert_eq!(validate_template("x}").len(), 1);
    }

    #[test]
    fn test_key_cache_survives_poisoned_lock() {
        let cache = std::sync::Arc::new(KeyCache::new());
        cache.keys("{a}");

        let poisoner = std::sync::Arc::clone(&cache);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the key cache");
        })
        .join();
        assert!(result.is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.keys("{b}"), vec!["b"]);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_cache_memoizes() {
        let cache = KeyCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.keys("{a}{b}"), vec!["a", "b"]);
        assert_eq!(cache.keys("{a}{b}"), vec!["a", "b"]);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
