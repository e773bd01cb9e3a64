//! Lane: one priority class's bounded FIFO plus its concurrency ceiling.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::time::Instant;

use super::record::RequestTask;
use crate::domain::{Priority, RequestType, TaskId};

/// An in-flight task as seen from outside the worker.
#[derive(Debug, Clone)]
pub struct ActiveTask {
    pub id: TaskId,
    pub request_type: RequestType,
    pub attempt: u32,
    pub started_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTaskView {
    pub id: TaskId,
    pub request_type: RequestType,
    pub lane: Priority,
    pub attempt: u32,
    pub running_ms: u64,
}

/// One queued priority class: a bounded FIFO, a concurrency ceiling and the
/// set of tasks currently executing.
///
/// The queue is a bounded `mpsc` channel. Its single receiver is taken by
/// the lane's worker loop (`take_receiver`); everyone else only sends.
/// A full queue makes `enqueue` wait, which is the lane's only admission
/// control.
///
/// The ceiling is a `Semaphore` with `max_concurrency` permits. A claimed
/// task holds one permit inside its `SlotGuard` until the guard drops,
/// whether the handler returned, timed out or panicked.
///
/// # Thread Safety
/// - `Send + Sync`; share it as `Arc<Lane>`
/// - the active set sits behind a `parking_lot::Mutex` that is never held
///   across an await
///
/// # Example
/// ```ignore
/// let lane = Arc::new(Lane::new(Priority::High, 200, 4));
/// let mut rx = lane.take_receiver().expect("first take");
/// assert!(lane.enqueue(task).await.is_ok());
///
/// let permit = lane.acquire_slot().await.expect("lane open");
/// let task = rx.recv().await.expect("queued above");
/// let guard = lane.claim(&task, permit);
/// assert_eq!(lane.active_count(), 1);
/// drop(guard);
/// assert_eq!(lane.active_count(), 0);
/// ```
pub struct Lane {
    priority: Priority,
    sender: mpsc::Sender<RequestTask>,
    receiver: Mutex<Option<mpsc::Receiver<RequestTask>>>,
    slots: Arc<Semaphore>,
    max_concurrency: usize,
    active: Mutex<HashMap<TaskId, ActiveTask>>,
    sequence: AtomicU64,
}

impl Lane {
    /// Zero `capacity` or `max_concurrency` is raised to 1; settings
    /// validation rejects zeros before a scheduler gets here.
    pub fn new(priority: Priority, capacity: usize, max_concurrency: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            priority,
            sender,
            receiver: Mutex::new(Some(receiver)),
            slots: Arc::new(Semaphore::new(max_concurrency.max(1))),
            max_concurrency: max_concurrency.max(1),
            active: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Append to the queue, waiting for room if it is full.
    ///
    /// Gives the task back if the lane's worker is gone.
    pub async fn enqueue(&self, task: RequestTask) -> Result<(), RequestTask> {
        self.sender.send(task).await.map_err(|err| err.0)
    }

    /// Hand the receiving half to the worker loop. Only the first call
    /// gets it.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<RequestTask>> {
        self.receiver.lock().take()
    }

    /// Tasks waiting in the queue right now.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Wait for a free execution slot.
    pub async fn acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).acquire_owned().await.ok()
    }

    /// Record `task` as executing. The returned guard frees both the
    /// active-set entry and the slot when dropped.
    pub fn claim(self: &Arc<Self>, task: &RequestTask, permit: OwnedSemaphorePermit) -> SlotGuard {
        self.active.lock().insert(
            task.id,
            ActiveTask {
                id: task.id,
                request_type: task.request_type,
                attempt: task.retry_attempts,
                started_at: Instant::now(),
            },
        );
        SlotGuard {
            lane: Arc::clone(self),
            id: task.id,
            _permit: permit,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    pub fn active_tasks(&self) -> Vec<ActiveTaskView> {
        let now = Instant::now();
        let mut tasks: Vec<ActiveTaskView> = self
            .active
            .lock()
            .values()
            .map(|t| ActiveTaskView {
                id: t.id,
                request_type: t.request_type,
                lane: self.priority,
                attempt: t.attempt,
                running_ms: now.saturating_duration_since(t.started_at).as_millis() as u64,
            })
            .collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    /// Monotonic per-lane counter of claimed tasks, starting at 1.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Releases a task's concurrency slot on drop, whatever way execution ended.
pub struct SlotGuard {
    lane: Arc<Lane>,
    id: TaskId,
    _permit: OwnedSemaphorePermit,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.lane.active.lock().remove(&self.id);
    }
}
