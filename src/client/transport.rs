//! HTTP transports
//!
//! The primary transport is a pooled `reqwest` client honouring the
//! configured certificate policy. The fallback transport is a separate client
//! that never verifies certificates, never reuses connections and gives up
//! after [`FALLBACK_TIMEOUT`]. Both hand back the raw status, headers and body
//! so the retry loop decides what counts as success.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::{ApiRequest, RawResponse, TlsPolicy, Transport};
use crate::error::{ApiError, ApiResult};

/// Timeout for the primary transport
pub const PRIMARY_TIMEOUT: Duration = Duration::from_secs(100);

/// Timeout for the fallback transport
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// How a request failed before producing an HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Reset/aborted connection, truncated read, TLS handshake or certificate failure
    ConnectionAnomaly,
    /// The request exceeded the transport timeout
    Timeout,
    /// Anything else (refused connection, DNS, malformed request)
    Other,
}

/// A request that produced no HTTP response
#[derive(Debug, Clone)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    #[cfg(test)]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = classify(&err);
        Self {
            kind,
            message: describe(&err),
        }
    }
}

/// Classify a `reqwest` failure by error kind and source chain
fn classify(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }

    let io_kind = io_error_kind(err);
    if matches!(
        io_kind,
        Some(
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::UnexpectedEof
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::InvalidData
        )
    ) {
        return TransportErrorKind::ConnectionAnomaly;
    }

    if err.is_connect() {
        // TLS handshake and certificate failures surface as connect errors;
        // a refused connection or failed lookup does not.
        return match io_kind {
            Some(io::ErrorKind::ConnectionRefused) | Some(io::ErrorKind::NotFound) => {
                TransportErrorKind::Other
            }
            _ if has_dns_failure(err) => TransportErrorKind::Other,
            _ => TransportErrorKind::ConnectionAnomaly,
        };
    }

    if err.is_body() || has_incomplete_message(err) {
        return TransportErrorKind::ConnectionAnomaly;
    }

    TransportErrorKind::Other
}

fn sources<'a>(err: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(err.source(), |&e| e.source())
}

fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    sources(err).find_map(|cause| cause.downcast_ref::<io::Error>().map(io::Error::kind))
}

fn has_incomplete_message(err: &reqwest::Error) -> bool {
    sources(err).any(|cause| {
        cause
            .downcast_ref::<hyper::Error>()
            .is_some_and(|e| e.is_incomplete_message() || e.is_canceled())
    })
}

fn has_dns_failure(err: &reqwest::Error) -> bool {
    // hyper-util's resolver does not export its error type; its Display is
    // the only marker available.
    sources(err).any(|cause| cause.to_string().starts_with("dns error"))
}

/// Flatten an error and its causes into one line
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    for cause in sources(err) {
        let cause = cause.to_string();
        if !message.contains(&cause) {
            message.push_str(": ");
            message.push_str(&cause);
        }
    }
    message
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    /// The primary transport, honouring the certificate policy
    pub fn primary(tls: TlsPolicy) -> ApiResult<Self> {
        let http = HttpClient::builder()
            .timeout(PRIMARY_TIMEOUT)
            .danger_accept_invalid_certs(tls == TlsPolicy::Permissive)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http })
    }

    /// The fallback transport: no certificate checks, fresh connection per
    /// request, bounded runtime
    pub fn insecure_fallback() -> ApiResult<Self> {
        let http = HttpClient::builder()
            .timeout(FALLBACK_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0)
            .http1_only()
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(body) = request.payload() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
