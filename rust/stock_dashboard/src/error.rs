// src/error.rs

use thiserror::Error;

// Rejected symbol input; never leaves the form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter a stock symbol")]
    Empty,
    #[error("Symbol is longer than {max} characters")]
    TooLong { max: u64 },
    #[error("Symbol must not contain whitespace or control characters")]
    InvalidCharacters,
}

// Malformed or schema-violating analysis payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed analysis payload: {0}")]
    Malformed(String),
    #[error("Required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("Field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Classification of a failed analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Http(u16),
    Parse,
}

/// Failure of one analysis request, kept in `FetchState::Error`.
///
/// Holds the classification rather than a flattened message so callers can tell a
/// transport failure from a server-reported or schema failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Backend responded with HTTP {0}")]
    Http(u16),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network(_) => ErrorKind::Network,
            FetchError::Http(status) => ErrorKind::Http(*status),
            FetchError::Parse(_) => ErrorKind::Parse,
        }
    }

    /// Message shown to the user in the dashboard's error indicator.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(_) => {
                "Could not reach the analysis service. Check your connection and try again.".to_string()
            }
            FetchError::Http(status) if (400..500).contains(status) => {
                format!("The analysis service rejected the request (HTTP {status}).")
            }
            FetchError::Http(status) => {
                format!("The analysis service failed to analyze this symbol (HTTP {status}).")
            }
            FetchError::Parse(_) => {
                "The analysis service returned data that could not be read.".to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
