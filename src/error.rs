//! Error types for adomigrate

use thiserror::Error;

use crate::client::Side;
use crate::client::normalize::{FailureKind, NormalizedError};

/// Result type alias for adomigrate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for the REST core
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// REST core errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Final failure of a request after the retry loop gave up
    #[error("{error} (after {attempts} attempt(s))")]
    Request {
        error: NormalizedError,
        attempts: u32,
    },

    #[error("Operation {id} did not reach a terminal state after {polls} polls")]
    OperationTimeout { id: String, polls: u32 },

    #[error("Operation {id} finished as {status}{}", detail_suffix(.message))]
    OperationFailed {
        id: String,
        status: String,
        message: Option<String>,
    },

    #[error("{kind} '{name}' does not exist")]
    MissingResource { kind: &'static str, name: String },

    #[error("{0} endpoint is not configured")]
    NotConfigured(Side),

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ApiError {
    /// The normalized upstream failure, if this error came from a request
    pub fn normalized(&self) -> Option<&NormalizedError> {
        match self {
            ApiError::Request { error, .. } => Some(error),
            _ => None,
        }
    }

    /// HTTP status of the final failed attempt (0 when no response was obtained)
    pub fn status(&self) -> Option<u16> {
        self.normalized().map(|e| e.status)
    }

    /// The upstream reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The upstream reported a conflicting resource
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// The request died at the connection/TLS level rather than with an HTTP error
    pub fn is_connection_anomaly(&self) -> bool {
        self.normalized()
            .is_some_and(|e| e.kind == FailureKind::ConnectionAnomaly)
    }
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!(": {}", message),
        _ => String::new(),
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `adomigrate init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Azure DevOps is not configured. Run `adomigrate init` or set ADO_URL and ADO_PAT.")]
    MissingAdo,

    #[error("Azure DevOps personal access token not configured. Set `ado.pat` or ADO_PAT.")]
    MissingAdoPat,

    #[error("GitLab is not configured. Set `gitlab.base_url` and `gitlab.token`, or GITLAB_URL and GITLAB_TOKEN.")]
    MissingGitLab,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
