use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::webservice::Operation;

/// A single schema violation, located by JSON pointer into the checked instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Application-level failure reported by Moodle in a well-formed JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub exception: Option<String>,
    pub errorcode: Option<String>,
    pub message: Option<String>,
    pub debuginfo: Option<String>,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.errorcode.as_deref().unwrap_or("unknown");
        match &self.message {
            Some(message) => write!(f, "{} ({})", message, code),
            None => write!(f, "{}", code),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("remote answered with HTTP {status}")]
    Status { status: u16, body: String },

    #[error("response body is not JSON: {0}")]
    Decode(String),

    #[error("HTTP method {0} is not supported by the webservice endpoint")]
    UnsupportedMethod(String),

    #[error("HTTP request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Failures a retry could plausibly fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout { .. } | TransportError::Connect(_) => true,
            TransportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("unknown webservice operation: {0}")]
    UnknownOperation(String),

    #[error("invalid query for {operation}: {}", join_issues(.issues))]
    InvalidQuery {
        operation: Operation,
        issues: Vec<SchemaIssue>,
    },

    #[error("transport failure calling {operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("{operation} failed remotely: {error}")]
    Remote {
        operation: Operation,
        error: RemoteError,
    },

    #[error("response of {operation} does not match its schema: {}", join_issues(.issues))]
    Shape {
        operation: Operation,
        issues: Vec<SchemaIssue>,
        raw: Value,
    },
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Config(_) => ErrorKind::Configuration,
            GatewayError::UnknownOperation(_) => ErrorKind::UnknownOperation,
            GatewayError::InvalidQuery { .. } => ErrorKind::InvalidQuery,
            GatewayError::Transport { .. } => ErrorKind::Transport,
            GatewayError::Remote { .. } => ErrorKind::Remote,
            GatewayError::Shape { .. } => ErrorKind::InvalidResponse,
        }
    }

    /// Raw payload kept for diagnostics when the response failed validation.
    pub fn raw_payload(&self) -> Option<&Value> {
        match self {
            GatewayError::Shape { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    UnknownOperation,
    InvalidQuery,
    Transport,
    Remote,
    InvalidResponse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::UnknownOperation => "unknown_operation",
            ErrorKind::InvalidQuery => "invalid_query",
            ErrorKind::Transport => "transport",
            ErrorKind::Remote => "remote",
            ErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

/// Serializable projection of a [`GatewayError`] for envelopes handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<SchemaIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteError>,
}

impl From<&GatewayError> for ErrorDetail {
    fn from(err: &GatewayError) -> Self {
        let (issues, remote) = match err {
            GatewayError::InvalidQuery { issues, .. } | GatewayError::Shape { issues, .. } => {
                (issues.clone(), None)
            }
            GatewayError::Remote { error, .. } => (Vec::new(), Some(error.clone())),
            _ => (Vec::new(), None),
        };
        ErrorDetail {
            kind: err.kind(),
            message: err.to_string(),
            issues,
            remote,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
