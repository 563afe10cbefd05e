use crate::constants::exit_codes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML. Original error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON. Original error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to build glob pattern. Original error: {0}")]
    GlobSetParseError(#[from] globset::Error),

    #[error("Key not found: '{path}'.")]
    KeyNotFound { path: String },

    #[error("Invalid key path '{path}': {reason}.")]
    InvalidPath { path: String, reason: String },

    #[error("Cannot descend into '{path}': it holds a scalar value.")]
    NotAContainer { path: String },

    #[error("Cannot load '{source_str}': not a file, a glob pattern, nor a YAML/JSON document.")]
    SourceError { source_str: String },

    /// Raised by the CLI when a validation report contains failures.
    #[error("Validation failed with {count} error(s).")]
    ValidationFailed { count: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience type alias for Results with the crate error type.
///
/// # Type Parameters
/// * `T` - The type of the success value
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with the failure status code
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(exit_codes::FAILURE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_key_not_found() {
        let err = Error::KeyNotFound { path: "a.b".to_string() };
        assert_eq!(err.to_string(), "Key not found: 'a.b'.");
    }

    #[test]
    fn wraps_yaml_errors() {
        let parse: std::result::Result<serde_yaml::Value, _> = serde_yaml::from_str("a: [");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::YamlError(_)));
    }

    #[test]
    fn displays_validation_failure_count() {
        let err = Error::ValidationFailed { count: 3 };
        assert_eq!(err.to_string(), "Validation failed with 3 error(s).");
    }
}
