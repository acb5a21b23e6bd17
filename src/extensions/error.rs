//! Error types for the extension runtime.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by script code or by the script engine itself.
///
/// These never escape the worker loop; they are logged at the command
/// dispatch boundary. The synchronous paths (`trigger`, menu queries)
/// hand them back to the caller wrapped in [`ExtensionError::Script`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("function {0}() not found")]
    MissingEntryPoint(String),

    #[error("{entry}(): {message}")]
    Raised { entry: String, message: String },

    #[error("{entry}() returned an unexpected value, expected {expected}")]
    BadReturn { entry: String, expected: String },

    #[error("script execution was cancelled")]
    Cancelled,

    #[error("could not create interpreter state: {0}")]
    InterpreterUnavailable(String),
}

/// Errors that can occur in the extension runtime.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("Manifest not found in extension: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest in {path}: {message}")]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("Extension '{0}' not found")]
    ExtensionNotFound(String),

    #[error("Extension '{0}' is already registered")]
    DuplicateExtension(String),

    #[error("Extension '{0}' is already activated")]
    AlreadyActive(String),

    #[error("Extension '{0}' is already exiting")]
    AlreadyExiting(String),

    #[error("Extension '{0}' is not activated")]
    NotActivated(String),

    #[error("Extension '{extension}' does not support {what}")]
    Unsupported { extension: String, what: &'static str },

    #[error("Extension '{0}' is busy")]
    Busy(String),

    #[error("Resource failure: {0}")]
    Resource(String),

    #[error("Script error in '{extension}': {source}")]
    Script {
        extension: String,
        #[source]
        source: ScriptError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ExtensionError {
    /// Benign errors expected under racing UI input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ExtensionError::AlreadyActive(_)
                | ExtensionError::AlreadyExiting(_)
                | ExtensionError::NotActivated(_)
                | ExtensionError::Busy(_)
        )
    }
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_display() {
        let err = ScriptError::Raised {
            entry: "activate".to_string(),
            message: "attempt to index a nil value".to_string(),
        };
        assert_eq!(err.to_string(), "activate(): attempt to index a nil value");
    }

    #[test]
    fn test_protocol_violations() {
        assert!(ExtensionError::AlreadyExiting("x".into()).is_protocol_violation());
        assert!(ExtensionError::NotActivated("x".into()).is_protocol_violation());
        assert!(!ExtensionError::Resource("spawn".into()).is_protocol_violation());
    }
}
