//! RequestTask: one unit of scheduled work.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::domain::{Priority, RequestType, TaskId};
use crate::error::SchedulerError;

pub type TaskResult = Result<serde_json::Value, SchedulerError>;

/// A submitted request plus the channel that resolves the submitter's future.
///
/// Owned by exactly one place at a time: the lane queue, then the worker
/// that claimed it. A retry moves the same task (and its responder) back
/// into the queue with `retry_attempts` bumped.
#[derive(Debug)]
pub struct RequestTask {
    pub id: TaskId,
    pub request_type: RequestType,
    pub priority: Priority,
    pub params: serde_json::Value,
    /// Wall-clock submission time.
    pub submitted_at: DateTime<Utc>,
    /// Monotonic start of the current attempt.
    pub started_at: Option<Instant>,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub max_retries: u32,
    responder: Option<oneshot::Sender<TaskResult>>,
}

impl RequestTask {
    pub fn new(
        id: TaskId,
        request_type: RequestType,
        priority: Priority,
        params: serde_json::Value,
        submitted_at: DateTime<Utc>,
        timeout: Duration,
        max_retries: u32,
    ) -> (Self, oneshot::Receiver<TaskResult>) {
        let (tx, rx) = oneshot::channel();
        let task = Self {
            id,
            request_type,
            priority,
            params,
            submitted_at,
            started_at: None,
            timeout,
            retry_attempts: 0,
            max_retries,
            responder: Some(tx),
        };
        (task, rx)
    }

    pub fn can_retry(&self) -> bool {
        self.priority.is_queued() && self.retry_attempts < self.max_retries
    }

    /// The same task, one retry further along.
    pub fn into_retry(mut self) -> Self {
        self.retry_attempts += 1;
        self.started_at = None;
        self
    }

    pub fn mark_started(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Whether the submitter is still waiting for the result.
    pub fn has_waiter(&self) -> bool {
        self.responder.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Resolve the submitter's future. A dropped receiver is not an error:
    /// the caller simply stopped waiting.
    pub fn complete(mut self, result: TaskResult) {
        if let Some(tx) = self.responder.take() {
            let _ = tx.send(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn task(priority: Priority, max_retries: u32) -> (RequestTask, oneshot::Receiver<TaskResult>) {
        RequestTask::new(
            TaskId::from_ulid(Ulid::new()),
            RequestType::Hover,
            priority,
            serde_json::json!({}),
            Utc::now(),
            Duration::from_millis(100),
            max_retries,
        )
    }

    #[test]
    fn retry_budget() {
        let (t, _rx) = task(Priority::Normal, 2);
        assert!(t.can_retry());
        let t = t.into_retry();
        assert!(t.can_retry());
        let t = t.into_retry();
        assert_eq!(t.retry_attempts, 2);
        assert!(!t.can_retry());
    }

    #[test]
    fn immediate_never_retries() {
        let (t, _rx) = task(Priority::Immediate, 5);
        assert!(!t.can_retry());
    }

    #[tokio::test]
    async fn complete_resolves_the_receiver_once_even_after_retry() {
        let (t, rx) = task(Priority::Low, 1);
        let id = t.id;
        let t = t.into_retry();
        assert_eq!(t.id, id);
        assert!(t.has_waiter());
        t.complete(Ok(serde_json::json!(42)));
        assert_eq!(rx.await.unwrap(), Ok(serde_json::json!(42)));
    }

    #[test]
    fn dropped_receiver_is_tolerated() {
        let (t, rx) = task(Priority::Low, 0);
        drop(rx);
        assert!(!t.has_waiter());
        t.complete(Ok(serde_json::Value::Null));
    }
}
