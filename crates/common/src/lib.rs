/// Common types and utilities for the contract synthesis pipeline
use std::time::Duration;

/// Error type for synthesis operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No base template exists for the requested family
    #[error("Unknown contract family: {0}")]
    UnknownFamily(String),

    /// The generation request failed its own field checks
    #[error("Invalid generation request: {}", .0.join(", "))]
    InvalidRequest(Vec<String>),

    /// The composed source failed the structural pre-check
    #[error("Validation failed: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),

    /// The external compiler could not be loaded
    #[error("Compiler engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The compiler reported fatal diagnostics
    #[error("Compilation failed with {} error(s)", errors.len())]
    CompilationFailed {
        /// Fatal diagnostics, verbatim
        errors: Vec<String>,
        /// Non-fatal diagnostics emitted alongside
        warnings: Vec<String>,
    },

    /// The compiler did not answer within the configured window
    #[error("Compilation timed out after {0:?}")]
    CompilationTimeout(Duration),

    /// The requested contract is absent from compiler output
    #[error("Contract {0} not found in compilation output")]
    ContractNotFound(String),

    /// Model-backed interpretation failed; never surfaced past the interpreter
    #[error("Interpretation failed: {0}")]
    InterpretationFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error when parsing data
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Error talking to a remote service
    #[error("HTTP error: {0}")]
    Http(String),

    /// Any other error with its source
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a new engine error
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Error::EngineUnavailable(msg.into())
    }

    /// Create a new interpretation error
    pub fn interpretation<S: Into<String>>(msg: S) -> Self {
        Error::InterpretationFailed(msg.into())
    }

    /// Create a new HTTP error
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Error::Http(msg.into())
    }

    /// Whether a caller may retry the same request unchanged.
    ///
    /// Only engine initialization failures qualify: the compiler context
    /// re-attempts loading on every call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::EngineUnavailable(_))
    }

    /// Diagnostics suitable for showing to the user, one per line
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Error::InvalidRequest(problems) | Error::ValidationFailed(problems) => problems.clone(),
            Error::CompilationFailed { errors, .. } => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Result type for synthesis operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(anyhow::anyhow!(s))
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(anyhow::anyhow!(s.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(format!("JSON parsing error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(format!("TOML serialization error: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_engine_errors_are_retryable() {
        assert!(Error::engine("solc missing").is_retryable());
        assert!(!Error::ContractNotFound("Widget".into()).is_retryable());
        assert!(!Error::ValidationFailed(vec!["Unbalanced braces".into()]).is_retryable());
    }

    #[test]
    fn test_compilation_failure_keeps_diagnostics_verbatim() {
        let err = Error::CompilationFailed {
            errors: vec!["ParserError: Expected ';'".into()],
            warnings: vec!["Warning: unused variable".into()],
        };
        assert_eq!(err.diagnostics(), vec!["ParserError: Expected ';'".to_string()]);
        assert_eq!(err.to_string(), "Compilation failed with 1 error(s)");
    }

    #[test]
    fn test_validation_message_joins_problems() {
        let err = Error::ValidationFailed(vec!["Unbalanced braces".into(), "Unbalanced parentheses".into()]);
        assert_eq!(err.to_string(), "Validation failed: Unbalanced braces, Unbalanced parentheses");
    }
}
