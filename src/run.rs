//! Submitting runs and waiting for them to finish

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::{AssistantApi, Run};
use crate::{Error, Result};

/// How long to wait for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status checks
    pub interval: Duration,
    /// Status checks before giving up with [`Error::Timeout`]
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 300,
        }
    }
}

/// Start a run over the conversation's pending turns
///
/// # Errors
///
/// Returns error if the remote call fails
pub async fn submit_run(
    api: &dyn AssistantApi,
    conversation_id: &str,
    assistant_id: &str,
) -> Result<Run> {
    let run = api.submit_run(conversation_id, assistant_id).await?;
    tracing::debug!(run_id = %run.id, status = %run.status, "run submitted");
    Ok(run)
}

/// Poll a run until it completes
///
/// Returns the run once its status is `completed`. Pending statuses keep it
/// polling at `policy.interval`.
///
/// # Errors
///
/// - `RunFailed` when the run reaches a failure status
/// - `Timeout` after `policy.max_attempts` checks without a terminal status
/// - `Cancelled` when `cancel` fires
/// - any error from the status fetch itself
pub async fn poll_until_terminal(
    api: &dyn AssistantApi,
    conversation_id: &str,
    run_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<Run> {
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let run = api.retrieve_run(conversation_id, run_id).await?;
        tracing::debug!(run_id, attempt, status = %run.status, "polled run");

        if run.status.is_completed() {
            return Ok(run);
        }

        if run.status.is_failure() {
            let reason = run
                .last_error
                .as_ref()
                .map_or_else(|| "no error reported".to_string(), |e| format!("{}: {}", e.code, e.message));
            tracing::warn!(run_id, status = %run.status, %reason, "run failed");
            return Err(Error::RunFailed {
                run_id: run.id,
                status: run.status,
                reason,
            });
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    Err(Error::Timeout {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::api::{Assistant, Conversation, Role, RunError, RunStatus, Turn};

    /// Replays a fixed sequence of run statuses
    struct ScriptedRuns {
        statuses: Mutex<VecDeque<RunStatus>>,
        polls: Mutex<u32>,
    }

    impl ScriptedRuns {
        fn new(statuses: &[RunStatus]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                polls: Mutex::new(0),
            }
        }

        fn polls(&self) -> u32 {
            *self.polls.lock().unwrap()
        }
    }

    #[async_trait]
    impl AssistantApi for ScriptedRuns {
        async fn create_assistant(&self, _: &str, _: &str) -> Result<Assistant> {
            unreachable!()
        }

        async fn create_conversation(&self) -> Result<Conversation> {
            unreachable!()
        }

        async fn append_turn(&self, _: &str, _: &str, _: Role) -> Result<Turn> {
            unreachable!()
        }

        async fn submit_run(&self, conversation_id: &str, _: &str) -> Result<Run> {
            Ok(Run {
                id: "run_1".to_string(),
                thread_id: conversation_id.to_string(),
                status: RunStatus::Queued,
                last_error: None,
            })
        }

        async fn retrieve_run(&self, conversation_id: &str, run_id: &str) -> Result<Run> {
            *self.polls.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            // Repeat the last status once the script runs out
            let status = if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                *statuses.front().unwrap()
            };
            let last_error = (status == RunStatus::Failed).then(|| RunError {
                code: "server_error".to_string(),
                message: "model overloaded".to_string(),
            });
            Ok(Run {
                id: run_id.to_string(),
                thread_id: conversation_id.to_string(),
                status,
                last_error,
            })
        }

        async fn list_turns(&self, _: &str) -> Result<Vec<Turn>> {
            unreachable!()
        }
    }

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn returns_on_completed() {
        let api = ScriptedRuns::new(&[
            RunStatus::Queued,
            RunStatus::InProgress,
            RunStatus::InProgress,
            RunStatus::Completed,
        ]);
        let run = poll_until_terminal(&api, "thread_1", "run_1", &fast(10), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(api.polls(), 4);
    }

    #[tokio::test]
    async fn failed_status_is_run_failed() {
        let api = ScriptedRuns::new(&[RunStatus::InProgress, RunStatus::Failed]);
        let err = poll_until_terminal(&api, "thread_1", "run_1", &fast(10), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::RunFailed {
                run_id,
                status,
                reason,
            } => {
                assert_eq!(run_id, "run_1");
                assert_eq!(status, RunStatus::Failed);
                assert!(reason.contains("model overloaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.polls(), 2);
    }

    #[tokio::test]
    async fn cancelled_status_is_run_failed() {
        let api = ScriptedRuns::new(&[RunStatus::Cancelling, RunStatus::Cancelled]);
        let err = poll_until_terminal(&api, "thread_1", "run_1", &fast(10), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RunFailed {
                status: RunStatus::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn pending_statuses_never_terminate_early() {
        let api = ScriptedRuns::new(&[RunStatus::Queued, RunStatus::InProgress]);
        let err = poll_until_terminal(&api, "thread_1", "run_1", &fast(5), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { attempts: 5 }));
        assert_eq!(api.polls(), 5);
    }

    #[tokio::test]
    async fn cancellation_stops_polling() {
        let api = ScriptedRuns::new(&[RunStatus::InProgress]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = poll_until_terminal(&api, "thread_1", "run_1", &fast(10), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(api.polls(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_sleep() {
        let api = ScriptedRuns::new(&[RunStatus::InProgress]);
        let cancel = CancellationToken::new();
        let policy = PollPolicy {
            interval: Duration::from_secs(3600),
            max_attempts: 10,
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = poll_until_terminal(&api, "thread_1", "run_1", &policy, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test]
    async fn submit_returns_queued_run() {
        let api = ScriptedRuns::new(&[RunStatus::Completed]);
        let run = submit_run(&api, "thread_1", "asst_1").await.unwrap();
        assert_eq!(run.status, RunStatus::Queued);
        assert_eq!(run.thread_id, "thread_1");
    }

    #[test]
    fn default_policy_values() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 300);
    }
}
