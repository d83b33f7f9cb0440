//! Long-running operation polling
//!
//! Azure DevOps answers project creation (and a few other mutations) with an
//! operation reference that has to be polled until it settles. The poller
//! treats a vanished operation as finished, rides out connection anomalies
//! on a short fixed delay, and gives up after a fixed number of polls.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::Serialize;

use super::models::OperationReference;
use super::retry::Sleeper;
use crate::error::{ApiError, ApiResult};

/// Delay after a poll that died on a connection anomaly
pub const ANOMALY_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Polled status of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl OperationStatus {
    /// Map the upstream status string. `notSet`, `queued`, `inProgress` and
    /// anything unknown are pending.
    pub fn from_api(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => OperationStatus::Succeeded,
            "failed" => OperationStatus::Failed,
            "cancelled" | "canceled" => OperationStatus::Cancelled,
            _ => OperationStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationStatus::Succeeded)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Succeeded => "succeeded",
            OperationStatus::Failed => "failed",
            OperationStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Final state of a polled operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationState {
    pub id: String,
    pub status: OperationStatus,
    /// The operation resource disappeared and success was assumed
    pub synthesized: bool,
    /// Number of polls issued
    pub polls: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationState {
    /// Convert a failed or cancelled state into an error
    pub fn into_result(self) -> ApiResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ApiError::OperationFailed {
                id: self.id,
                status: self.status.to_string(),
                message: self.message,
            })
        }
    }
}

/// Poll interval and budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_polls: 60,
        }
    }
}

/// Polls an operation until it reaches a terminal state
pub struct OperationPoller {
    sleeper: Arc<dyn Sleeper>,
    options: PollOptions,
}

impl OperationPoller {
    pub fn new(sleeper: Arc<dyn Sleeper>, options: PollOptions) -> Self {
        Self { sleeper, options }
    }

    /// Poll `fetch` until the operation settles.
    ///
    /// Failed and cancelled operations are returned as final states; use
    /// [`OperationState::into_result`] to treat them as errors.
    pub async fn await_completion<F, Fut>(&self, id: &str, mut fetch: F) -> ApiResult<OperationState>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<OperationReference>>,
    {
        let max_polls = self.options.max_polls.max(1);

        for poll in 1..=max_polls {
            let delay = match fetch().await {
                Ok(reference) => {
                    let status = OperationStatus::from_api(&reference.status);
                    debug!("Operation {} poll {}/{}: {}", id, poll, max_polls, reference.status);
                    if status.is_terminal() {
                        return Ok(OperationState {
                            id: id.to_string(),
                            status,
                            synthesized: false,
                            polls: poll,
                            message: reference.result_message,
                        });
                    }
                    self.options.interval
                }
                Err(err) if err.is_not_found() => {
                    debug!("Operation {} no longer exists; assuming it completed", id);
                    return Ok(OperationState {
                        id: id.to_string(),
                        status: OperationStatus::Succeeded,
                        synthesized: true,
                        polls: poll,
                        message: Some("operation resource not found; assumed completed".to_string()),
                    });
                }
                Err(err) if err.is_connection_anomaly() => {
                    if poll == max_polls {
                        return Err(err);
                    }
                    debug!("Operation {} poll {} hit a connection anomaly: {}", id, poll, err);
                    ANOMALY_RETRY_DELAY
                }
                Err(err) => return Err(err),
            };

            if poll < max_polls {
                self.sleeper.sleep(delay).await;
            }
        }

        Err(ApiError::OperationTimeout {
            id: id.to_string(),
            polls: max_polls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Side;
    use crate::client::mock::RecordingSleeper;
    use crate::client::normalize::{FailureKind, NormalizedError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn reference(status: &str) -> ApiResult<OperationReference> {
        Ok(OperationReference {
            id: "op-1".to_string(),
            status: status.to_string(),
            url: None,
            result_message: None,
        })
    }

    fn request_error(status: u16, kind: FailureKind) -> ApiResult<OperationReference> {
        Err(ApiError::Request {
            error: NormalizedError {
                side: Side::AzureDevOps,
                endpoint: "https://ado/_apis/operations/op-1".to_string(),
                status,
                message: "x".to_string(),
                kind,
            },
            attempts: 1,
        })
    }

    /// Replays scripted poll results and counts calls
    struct Script {
        results: Mutex<VecDeque<ApiResult<OperationReference>>>,
        calls: Mutex<u32>,
    }

    impl Script {
        fn new(results: Vec<ApiResult<OperationReference>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            }
        }

        async fn next(&self) -> ApiResult<OperationReference> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| reference("inProgress"))
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    fn poller(sleeper: &Arc<RecordingSleeper>, max_polls: u32) -> OperationPoller {
        OperationPoller::new(
            sleeper.clone(),
            PollOptions {
                interval: Duration::from_secs(3),
                max_polls,
            },
        )
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(OperationStatus::from_api("succeeded"), OperationStatus::Succeeded);
        assert_eq!(OperationStatus::from_api("failed"), OperationStatus::Failed);
        assert_eq!(OperationStatus::from_api("cancelled"), OperationStatus::Cancelled);
        for pending in ["notSet", "queued", "inProgress", "somethingNew"] {
            assert_eq!(OperationStatus::from_api(pending), OperationStatus::Pending);
        }
        assert!(!OperationStatus::Pending.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![reference("succeeded")]);
        let state = poller(&sleeper, 60)
            .await_completion("op-1", || script.next())
            .await
            .unwrap();

        assert_eq!(state.status, OperationStatus::Succeeded);
        assert!(!state.synthesized);
        assert_eq!(state.polls, 1);
        assert_eq!(script.calls(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_polls_until_terminal() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![
            reference("queued"),
            reference("inProgress"),
            reference("succeeded"),
        ]);
        let state = poller(&sleeper, 60)
            .await_completion("op-1", || script.next())
            .await
            .unwrap();

        assert_eq!(state.polls, 3);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(3); 2]);
    }

    #[tokio::test]
    async fn test_not_found_synthesizes_success() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![reference("inProgress"), request_error(404, FailureKind::Http)]);
        let state = poller(&sleeper, 60)
            .await_completion("op-1", || script.next())
            .await
            .unwrap();

        assert_eq!(state.status, OperationStatus::Succeeded);
        assert!(state.synthesized);
        assert!(state.message.is_some());
    }

    #[tokio::test]
    async fn test_timeout_after_exactly_max_polls() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![]);
        let err = poller(&sleeper, 5)
            .await_completion("op-1", || script.next())
            .await
            .unwrap_err();

        assert_eq!(script.calls(), 5);
        assert_eq!(sleeper.sleeps().len(), 4);
        match err {
            ApiError::OperationTimeout { id, polls } => {
                assert_eq!(id, "op-1");
                assert_eq!(polls, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_anomaly_uses_short_delay() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![
            request_error(0, FailureKind::ConnectionAnomaly),
            reference("inProgress"),
            reference("succeeded"),
        ]);
        let state = poller(&sleeper, 60)
            .await_completion("op-1", || script.next())
            .await
            .unwrap();

        assert_eq!(state.polls, 3);
        assert_eq!(
            sleeper.sleeps(),
            vec![ANOMALY_RETRY_DELAY, Duration::from_secs(3)]
        );
    }

    #[tokio::test]
    async fn test_connection_anomaly_on_last_poll_propagates() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![
            request_error(0, FailureKind::ConnectionAnomaly),
            request_error(503, FailureKind::ConnectionAnomaly),
        ]);
        let err = poller(&sleeper, 2)
            .await_completion("op-1", || script.next())
            .await
            .unwrap_err();

        assert!(err.is_connection_anomaly());
        assert_eq!(sleeper.sleeps(), vec![ANOMALY_RETRY_DELAY]);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_immediately() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![request_error(401, FailureKind::Http), reference("succeeded")]);
        let err = poller(&sleeper, 60)
            .await_completion("op-1", || script.next())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(script.calls(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_failed_is_returned_then_converted() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let script = Script::new(vec![Ok(OperationReference {
            id: "op-1".to_string(),
            status: "failed".to_string(),
            url: None,
            result_message: Some("TF400898: project exists".to_string()),
        })]);
        let state = poller(&sleeper, 60)
            .await_completion("op-1", || script.next())
            .await
            .unwrap();

        assert_eq!(state.status, OperationStatus::Failed);
        let err = state.into_result().unwrap_err();
        assert!(err.to_string().contains("TF400898"));
    }
}
