//! REST core shared by the Azure DevOps and GitLab upstreams
//!
//! Requests are described by [`ApiRequest`], sent through a [`Transport`],
//! and driven to completion by the [`retry::RetryingExecutor`]. The
//! [`MigrationClient`] ties these together with the session configuration.

use std::fmt;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

pub mod auth;
pub mod envelope;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod normalize;
pub mod operation;
pub mod retry;
pub mod session;
pub mod transport;

pub use models::{GitLabProject, OperationReference, Project, Repository};
pub use operation::{OperationStatus, PollOptions};
pub use retry::RetryPolicy;
pub use session::{AdoEndpoint, GitLabEndpoint, MigrationClient, SessionConfig};

use transport::TransportError;

/// Which upstream a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    /// Azure DevOps (Services or Server)
    AzureDevOps,
    /// GitLab
    GitLab,
}

impl Side {
    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Side::AzureDevOps => "ADO",
            Side::GitLab => "GitLab",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Certificate validation policy for HTTPS endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsPolicy {
    /// Verify server certificates
    #[default]
    Strict,
    /// Accept self-signed certificates; enables the fallback transport
    Permissive,
}

impl fmt::Display for TlsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsPolicy::Strict => f.write_str("strict"),
            TlsPolicy::Permissive => f.write_str("permissive"),
        }
    }
}

/// A fully built, authenticated request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method,
            url: url.into(),
            headers,
            body: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The body to put on the wire; only POST, PUT and PATCH carry one.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        if carries_body(&self.method) {
            self.body.as_ref()
        } else {
            None
        }
    }
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// An HTTP response as received, before any interpretation
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    #[cfg(test)]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = reqwest::header::HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One way of putting a request on the wire
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request once. Any HTTP status is `Ok`; `Err` means no usable
    /// response was obtained.
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}
