use crate::error::{MediaError, Result};
use crate::task::{Task, TaskState};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// Interval between status checks used by every provider.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Wall-clock budget for a task to reach a terminal state.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Anything that can report the current state of a submitted task.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch_task(&self, task_id: &str) -> Result<Task>;
}

/// What the poll loop does when a status query itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Return the error immediately.
    FailFast,
    /// Log a warning and try again after the normal interval.
    WarnAndRetry,
}

/// How a task is polled until it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    /// Secondary guard on the number of status queries.
    pub max_attempts: Option<u32>,
    pub on_error: ErrorPolicy,
}

impl PollPolicy {
    pub const fn fail_fast(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            max_attempts: None,
            on_error: ErrorPolicy::FailFast,
        }
    }

    pub const fn warn_and_retry(interval: Duration, timeout: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            timeout,
            max_attempts: Some(max_attempts),
            on_error: ErrorPolicy::WarnAndRetry,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fail_fast(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }
}

/// Polls `source` until the task is done, failed, or the policy gives up.
///
/// At least one status query is always made. The deadline is checked after
/// each query, so a slow request can overrun it by one request's latency, but
/// no sleep ever starts once the deadline has passed.
///
/// # Errors
///
/// - [`MediaError::MissingArtifact`] if the task is done without a result URL.
/// - [`MediaError::TaskFailed`] if the vendor reports failure.
/// - [`MediaError::Timeout`] once the deadline passes while still in progress.
/// - [`MediaError::AttemptsExhausted`] when `max_attempts` queries were spent.
/// - Any query error, when the policy is [`ErrorPolicy::FailFast`].
pub async fn wait_for_task<S>(source: &S, task_id: &str, policy: &PollPolicy) -> Result<Task>
where
    S: TaskSource + ?Sized,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempts: u32 = 0;
    let mut last_status = String::from("unknown");

    loop {
        attempts += 1;
        match source.fetch_task(task_id).await {
            Ok(task) => match task.status {
                TaskState::Done => {
                    let has_artifact = task.result.as_deref().is_some_and(|url| !url.is_empty());
                    if !has_artifact {
                        return Err(MediaError::MissingArtifact {
                            task_id: task.id,
                        });
                    }
                    info!(task_id = %task.id, "task finished");
                    return Ok(task);
                }
                TaskState::Failed => {
                    return Err(MediaError::TaskFailed {
                        task_id: task.id,
                        message: task.error.unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                TaskState::Pending | TaskState::Running => {
                    last_status = task.vendor_status;
                }
            },
            Err(err) => match policy.on_error {
                ErrorPolicy::FailFast => return Err(err),
                ErrorPolicy::WarnAndRetry => {
                    warn!(task_id, attempt = attempts, error = %err, "status query failed");
                }
            },
        }

        if Instant::now() >= deadline {
            return Err(MediaError::Timeout {
                task_id: task_id.to_string(),
                waited: policy.timeout,
                last_status,
            });
        }
        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(MediaError::AttemptsExhausted {
                task_id: task_id.to_string(),
                attempts,
            });
        }

        info!(
            status = %last_status,
            "waiting {}s...",
            policy.interval.as_secs_f32()
        );
        sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::StatusTable;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const TABLE: StatusTable = StatusTable::new(&[
        ("queued", TaskState::Pending),
        ("running", TaskState::Running),
        ("succeeded", TaskState::Done),
        ("failed", TaskState::Failed),
    ]);

    /// Replays scripted responses, repeating the last one forever.
    struct Script {
        responses: Mutex<VecDeque<Result<Task>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl Script {
        fn new(responses: Vec<Result<Task>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TaskSource for Script {
        async fn fetch_task(&self, task_id: &str) -> Result<Task> {
            self.calls.lock().unwrap().push(Instant::now());
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                return responses.pop_front().unwrap();
            }
            match responses.front().unwrap() {
                Ok(task) => Ok(task.clone()),
                Err(_) => Err(MediaError::InvalidInput(format!("{} unavailable", task_id))),
            }
        }
    }

    fn snapshot(status: &str, url: Option<&str>, error: Option<&str>) -> Result<Task> {
        Ok(Task::from_vendor(
            "t-1",
            &TABLE,
            status,
            url.map(str::to_string),
            error.map(str::to_string),
        ))
    }

    fn transport_error() -> Result<Task> {
        Err(MediaError::HttpStatus {
            status: 502,
            body: "bad gateway".into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn returns_done_task_with_artifact() {
        let source = Script::new(vec![
            snapshot("queued", None, None),
            snapshot("running", None, None),
            snapshot("succeeded", Some("https://cdn/v.mp4"), None),
        ]);

        let task = wait_for_task(&source, "t-1", &PollPolicy::default()).await.unwrap();

        assert_eq!(task.status, TaskState::Done);
        assert_eq!(task.result.as_deref(), Some("https://cdn/v.mp4"));
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn done_without_artifact_is_an_error() {
        let source = Script::new(vec![snapshot("succeeded", None, None)]);

        let err = wait_for_task(&source, "t-1", &PollPolicy::default()).await.unwrap_err();

        assert!(matches!(err, MediaError::MissingArtifact { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn done_with_empty_artifact_set_directly_is_an_error() {
        let mut task = Task::submitted("t-1");
        task.status = TaskState::Done;
        task.result = Some(String::new());
        let source = Script::new(vec![Ok(task)]);

        let err = wait_for_task(&source, "t-1", &PollPolicy::default()).await.unwrap_err();

        assert!(matches!(err, MediaError::MissingArtifact { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_task_carries_vendor_message() {
        let source = Script::new(vec![
            snapshot("running", None, None),
            snapshot("failed", None, Some("content policy violation")),
        ]);

        let err = wait_for_task(&source, "t-1", &PollPolicy::default()).await.unwrap_err();

        match err {
            MediaError::TaskFailed { task_id, message } => {
                assert_eq!(task_id, "t-1");
                assert_eq!(message, "content policy violation");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_still_checks_once_and_never_sleeps() {
        let source = Script::new(vec![snapshot("queued", None, None)]);
        let policy = PollPolicy::fail_fast(Duration::from_secs(5), Duration::ZERO);
        let started = Instant::now();

        let err = wait_for_task(&source, "t-1", &policy).await.unwrap_err();

        assert_eq!(source.call_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        match err {
            MediaError::Timeout { last_status, .. } => assert_eq!(last_status, "queued"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_deadline_without_an_extra_sleep() {
        let source = Script::new(vec![snapshot("running", None, None)]);
        let started = Instant::now();

        let err = wait_for_task(&source, "t-1", &PollPolicy::default()).await.unwrap_err();

        // Checks at 0s, 5s, ..., 300s; the check at 300s hits the deadline.
        assert_eq!(source.call_count(), 61);
        assert_eq!(started.elapsed(), Duration::from_secs(300));
        assert!(matches!(err, MediaError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn fail_fast_propagates_query_errors() {
        let source = Script::new(vec![
            snapshot("running", None, None),
            transport_error(),
            snapshot("succeeded", Some("https://cdn/v.mp4"), None),
        ]);

        let err = wait_for_task(&source, "t-1", &PollPolicy::default()).await.unwrap_err();

        assert!(matches!(err, MediaError::HttpStatus { status: 502, .. }));
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn warn_and_retry_survives_query_errors() {
        let source = Script::new(vec![
            transport_error(),
            transport_error(),
            snapshot("succeeded", Some("https://cdn/v.mp4"), None),
        ]);
        let policy = PollPolicy::warn_and_retry(Duration::from_secs(5), Duration::from_secs(600), 120);

        let task = wait_for_task(&source, "t-1", &policy).await.unwrap();

        assert_eq!(task.status, TaskState::Done);
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_cap_bounds_retries() {
        let source = Script::new(vec![transport_error()]);
        let policy = PollPolicy::warn_and_retry(Duration::from_secs(5), Duration::from_secs(600), 4);

        let err = wait_for_task(&source, "t-1", &policy).await.unwrap_err();

        assert!(matches!(err, MediaError::AttemptsExhausted { attempts: 4, .. }));
        assert_eq!(source.call_count(), 4);
    }
}
