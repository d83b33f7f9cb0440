//! Retrying request executor
//!
//! Each attempt goes out on the primary transport. A connection anomaly under
//! the permissive certificate policy gets one more try on the fallback
//! transport within the same attempt. Failures whose status is in the
//! transient set are retried with exponential backoff until the attempt
//! budget runs out; everything else is returned at once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::normalize::{Failure, SYNTHESIZED_STATUS, normalize};
use super::{ApiRequest, Side, Transport};
use crate::error::{ApiError, ApiResult};
use crate::mask::SecretMasker;

/// Statuses worth retrying
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);

/// Whether a status is in the transient set
pub fn is_transient(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `initial * 2^(attempt-1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1u32 << exponent)
    }
}

/// Waits between attempts and polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of one attempt, for the call log
enum Outcome {
    Status(u16),
    NoResponse,
}

/// Drives requests through the transports with retry and fallback
pub struct RetryingExecutor {
    primary: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Transport>>,
    sleeper: Arc<dyn Sleeper>,
    masker: SecretMasker,
    log_calls: bool,
}

impl RetryingExecutor {
    pub fn new(primary: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>, masker: SecretMasker) -> Self {
        Self {
            primary,
            fallback: None,
            sleeper,
            masker,
            log_calls: false,
        }
    }

    /// Enable the fallback transport. Only wired up under the permissive
    /// certificate policy.
    pub fn with_fallback(mut self, fallback: Arc<dyn Transport>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_call_logging(mut self, enabled: bool) -> Self {
        self.log_calls = enabled;
        self
    }

    /// Execute a request, returning the decoded JSON body.
    ///
    /// An empty success body decodes to `Value::Null`; a non-JSON success body
    /// is returned as `Value::String`.
    pub async fn execute(
        &self,
        request: &ApiRequest,
        side: Side,
        policy: &RetryPolicy,
    ) -> ApiResult<Value> {
        self.execute_with_headers(request, side, policy)
            .await
            .map(|(body, _)| body)
    }

    /// Like [`execute`](Self::execute), also returning the headers of the
    /// successful response
    pub async fn execute_with_headers(
        &self,
        request: &ApiRequest,
        side: Side,
        policy: &RetryPolicy,
    ) -> ApiResult<(Value, HeaderMap)> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = self.attempt(request).await;

            let failure = match result {
                Ok((status, headers, body)) => {
                    self.log_call(side, request, Outcome::Status(status), started);
                    if attempt > 1 {
                        debug!(
                            "[{}] {} {} succeeded on attempt {}",
                            side,
                            request.method,
                            self.masker.mask(&request.url),
                            attempt
                        );
                    }
                    return Ok((body, headers));
                }
                Err(failure) => failure,
            };

            let outcome = match &failure {
                Failure::Status { status, .. } => Outcome::Status(*status),
                Failure::Synthesized { .. } => Outcome::Status(SYNTHESIZED_STATUS),
                Failure::Transport(_) => Outcome::NoResponse,
            };
            self.log_call(side, request, outcome, started);

            let error = normalize(&failure, side, &request.url, &self.masker);
            if !is_transient(error.status) || attempt >= max_attempts {
                return Err(ApiError::Request {
                    error,
                    attempts: attempt,
                });
            }

            let delay = policy.delay_for(attempt);
            warn!(
                "[{}] {} {} returned {} ({}); retrying in {}s ({} attempt(s) left)",
                side,
                request.method,
                error.endpoint,
                error.status,
                error.message,
                delay.as_secs_f64(),
                max_attempts - attempt
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    /// One attempt: the primary transport, then the fallback if it applies
    async fn attempt(&self, request: &ApiRequest) -> Result<(u16, HeaderMap, Value), Failure> {
        let failure = match self.primary.send(request).await {
            Ok(response) if response.is_success() => {
                return Ok((response.status, response.headers, decode_body(&response.body)));
            }
            Ok(response) => Failure::Status {
                status: response.status,
                body: response.body,
            },
            Err(err) => Failure::Transport(err),
        };

        match &self.fallback {
            Some(fallback) if failure.is_connection_anomaly() => {
                debug!(
                    "Primary transport hit a connection anomaly on {}; trying fallback transport",
                    self.masker.mask(&request.url)
                );
                self.attempt_fallback(fallback.as_ref(), request).await
            }
            _ => Err(failure),
        }
    }

    async fn attempt_fallback(
        &self,
        fallback: &dyn Transport,
        request: &ApiRequest,
    ) -> Result<(u16, HeaderMap, Value), Failure> {
        let response = match fallback.send(request).await {
            Ok(response) => response,
            Err(err) => {
                return Err(Failure::Synthesized {
                    reason: format!("fallback transport failed: {}", err.message),
                });
            }
        };

        let blank = response.body.trim().is_empty();
        if response.is_success() {
            if blank {
                return Err(Failure::Synthesized {
                    reason: format!(
                        "fallback transport returned HTTP {} with an empty body",
                        response.status
                    ),
                });
            }
            return Ok((response.status, response.headers, decode_body(&response.body)));
        }

        if blank || serde_json::from_str::<Value>(&response.body).is_err() {
            return Err(Failure::Synthesized {
                reason: format!(
                    "fallback transport returned HTTP {} with an unreadable body",
                    response.status
                ),
            });
        }

        Err(Failure::Status {
            status: response.status,
            body: response.body,
        })
    }

    fn log_call(&self, side: Side, request: &ApiRequest, outcome: Outcome, started: Instant) {
        if !self.log_calls {
            return;
        }
        let (mark, status) = match outcome {
            Outcome::Status(status) if (200..300).contains(&status) => ("✓", status.to_string()),
            Outcome::Status(status) => ("✗", status.to_string()),
            Outcome::NoResponse => ("✗", "ERR".to_string()),
        };
        info!(
            "{}",
            call_line(
                side,
                mark,
                request.method.as_str(),
                &self.masker.mask(&request.url),
                &status,
                started.elapsed()
            )
        );
    }
}

/// `[SIDE] <✓|✗> METHOD maskedURI → STATUS (N ms)`
pub fn call_line(
    side: Side,
    mark: &str,
    method: &str,
    masked_url: &str,
    status: &str,
    elapsed: Duration,
) -> String {
    format!(
        "[{}] {} {} {} → {} ({} ms)",
        side,
        mark,
        method,
        masked_url,
        status,
        elapsed.as_millis()
    )
}

fn decode_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
