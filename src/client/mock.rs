//! Scripted transport and sleeper for testing
//!
//! Provides deterministic stand-ins for the network and the timer so the
//! retry and polling state machines can be driven without real I/O.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::retry::Sleeper;
use super::transport::{TransportError, TransportErrorKind};
use super::{ApiRequest, RawResponse, Transport};

/// Transport that replays scripted responses in order.
///
/// # Example
/// ```ignore
/// let transport = MockTransport::new()
///     .respond(503, "")
///     .respond(200, r#"{"value":[]}"#);
/// ```
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an HTTP response
    pub fn respond(self, status: u16, body: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(RawResponse::new(status, body)));
        self
    }

    /// Queue a prepared response, headers included
    pub fn respond_raw(self, response: RawResponse) -> Self {
        self.script.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a transport-level failure
    pub fn fail(self, kind: TransportErrorKind, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(kind, message)));
        self
    }

    /// Number of requests sent so far
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests sent so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorKind::Other,
                format!("no scripted response for {} {}", request.method, request.url),
            ))
        })
    }
}

/// Sleeper that records requested delays and returns immediately
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
