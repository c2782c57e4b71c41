use std::fmt;

/// Category of a failed logical operation.
///
/// The kind is the only thing callers are expected to branch on; the UI treats
/// `Forbidden` as a row-level-security hint and `TranslationUnsupported` as a
/// request to simplify the active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Forbidden,
    /// Network or connection failure; the request never reached a backend
    /// able to answer it.
    BackendUnavailable,
    /// The backend accepted the request shape but execution failed.
    QueryFailed,
    /// A structured filter/sort could not be safely expressed in the active
    /// backend's dialect.
    TranslationUnsupported,
}

impl ErrorKind {
    /// Map an HTTP status code to an error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            _ => Self::QueryFailed,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not found"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::BackendUnavailable => write!(f, "Backend unavailable"),
            Self::QueryFailed => write!(f, "Query failed"),
            Self::TranslationUnsupported => write!(f, "Translation unsupported"),
        }
    }
}

/// Error returned by every logical operation, whichever transport served it.
///
/// `message` is the backend's original text whenever the backend produced one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    /// Build an error from a non-2xx HTTP response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            message: message.into(),
            status_code: Some(status),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, msg)
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::QueryFailed, msg)
    }

    pub fn translation_unsupported(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TranslationUnsupported, msg)
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == ErrorKind::Forbidden
    }
}

impl From<serde_json::Error> for OperationError {
    fn from(e: serde_json::Error) -> Self {
        Self::query_failed(format!("Failed to parse response: {e}"))
    }
}

/// Result alias using OperationError.
pub type OperationResult<T> = Result<T, OperationError>;

/// Errors raised while loading, saving or applying client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Transport unavailable: {0}")]
    Transport(String),
}
