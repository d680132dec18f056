//! Structured error types for configuration loading and resolution.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    NotAMapping,
    InvalidAliases,
    InvalidFieldValue,
    TypeMismatch,

    // Not found errors
    ConfigNotFound,
    ConfigNotLoaded,

    // Input errors
    IoError,
    ParseError,
}

/// Errors raised by the config engine and the loader around it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config root must be a JSON object, got {found}")]
    NotAMapping { found: String },

    #[error("aliases must be an array, got {found}")]
    InvalidAliases { found: String },

    #[error("alias entries must be strings, numbers or booleans, got {found}")]
    InvalidAliasEntry { found: String },

    #[error("no matching config node found for path: {path}")]
    NoMatch { path: String },

    #[error("configuration not loaded")]
    NotLoaded,

    #[error("config value at {path} is {found}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::NotAMapping { .. } => ErrorCode::NotAMapping,
            ConfigError::InvalidAliases { .. } | ConfigError::InvalidAliasEntry { .. } => {
                ErrorCode::InvalidAliases
            }
            ConfigError::NoMatch { .. } => ErrorCode::ConfigNotFound,
            ConfigError::NotLoaded => ErrorCode::ConfigNotLoaded,
            ConfigError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            ConfigError::Validation { .. } => ErrorCode::InvalidFieldValue,
            ConfigError::Io { .. } => ErrorCode::IoError,
            ConfigError::Json(_) | ConfigError::Yaml(_) => ErrorCode::ParseError,
        }
    }

    // Convenience constructors

    pub fn no_match(path: &[impl AsRef<str>]) -> Self {
        ConfigError::NoMatch {
            path: format_path(path),
        }
    }

    pub fn type_mismatch(path: &[impl AsRef<str>], expected: &'static str, found: impl fmt::Display) -> Self {
        ConfigError::TypeMismatch {
            path: format_path(path),
            expected,
            found: found.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ConfigError::Validation {
            message: message.into(),
        }
    }

    pub fn io(path: impl fmt::Display, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_string(),
            source,
        }
    }

    /// Structured form used by the CLI for error output.
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Serializable error body.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

/// Render a lookup path the way it appears in error messages: `[a, b, c]`.
pub fn format_path(path: &[impl AsRef<str>]) -> String {
    let parts: Vec<&str> = path.iter().map(|p| p.as_ref()).collect();
    format!("[{}]", parts.join(", "))
}

/// Result type for config operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_message_contains_path() {
        let err = ConfigError::no_match(&["python", "commands"]);
        assert_eq!(
            err.to_string(),
            "no matching config node found for path: [python, commands]"
        );
        assert_eq!(err.code(), ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_report_serializes_code() {
        let err = ConfigError::InvalidAliases {
            found: "string".into(),
        };
        let json = serde_json::to_value(err.to_report()).unwrap();
        assert_eq!(json["code"], "INVALID_ALIASES");
        assert_eq!(json["message"], "aliases must be an array, got string");
    }
}
