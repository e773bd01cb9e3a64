//! Lane worker loop.
//!
//! One loop per queued lane:
//! 1. wait until background processing is allowed
//! 2. wait for a free concurrency slot
//! 3. take the next task from the lane queue
//! 4. fork its execution; the slot travels with it and is released on drop
//!
//! A failed attempt that may be retried releases its slot, sleeps the
//! backoff delay and goes to the back of the same lane.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::scheduler::SchedulerShared;
use crate::error::SchedulerError;
use crate::queue::{Lane, RequestTask, SlotGuard};

pub(crate) async fn run(
    shared: Arc<SchedulerShared>,
    lane: Arc<Lane>,
    mut rx: mpsc::Receiver<RequestTask>,
) {
    let priority = lane.priority();
    let mut ready_rx = shared.ready_tx.subscribe();
    let mut shutdown_rx = shared.shutdown_tx.subscribe();
    tracing::debug!(lane = %priority, "lane worker started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Gate closed: nothing in this lane starts until it reopens.
        let gate = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            res = async { ready_rx.wait_for(|ready| *ready).await.map(|_| ()) } => res,
        };
        if gate.is_err() {
            break;
        }

        let permit = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            permit = lane.acquire_slot() => permit,
        };
        let Some(permit) = permit else {
            break;
        };

        let task = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            task = rx.recv() => task,
        };
        let Some(mut task) = task else {
            break;
        };

        let sequence = lane.next_sequence();
        task.mark_started();
        let guard = lane.claim(&task, permit);
        shared.stats.record_started(priority, task.request_type);
        tracing::trace!(task_id = %task.id, request_type = %task.request_type, lane = %priority, attempt = task.retry_attempts, "claimed");

        tokio::spawn(execute(Arc::clone(&shared), task, guard));

        let interval = shared.settings.yield_interval;
        if interval > 0 && sequence % interval == 0 {
            tokio::time::sleep(shared.settings.yield_delay()).await;
        }
    }

    tracing::debug!(lane = %priority, "lane worker stopped");
}

async fn execute(shared: Arc<SchedulerShared>, task: RequestTask, guard: SlotGuard) {
    let priority = task.priority;
    let request_type = task.request_type;
    let (result, elapsed) = shared.execute_attempt(&task).await;
    drop(guard);

    let err = match result {
        Ok(value) => {
            shared.stats.record_success(priority, request_type, elapsed);
            task.complete(Ok(value));
            return;
        }
        Err(err) => err,
    };

    shared.stats.record_failure(priority, request_type, elapsed);

    if !(err.is_retriable() && task.can_retry()) {
        shared.stats.record_dropped(priority);
        tracing::warn!(
            task_id = %task.id,
            %request_type,
            attempts = task.retry_attempts + 1,
            error = %err,
            "request failed"
        );
        task.complete(Err(err));
        return;
    }

    let task = task.into_retry();
    let delay = shared.retry.next_delay(task.retry_attempts);
    shared.stats.record_retry(priority);
    tracing::debug!(
        task_id = %task.id,
        %request_type,
        retry = task.retry_attempts,
        delay_ms = delay.as_millis() as u64,
        error = %err,
        "retrying"
    );

    tokio::time::sleep(delay).await;
    requeue(&shared, task).await;
}

async fn requeue(shared: &SchedulerShared, task: RequestTask) {
    let priority = task.priority;
    let shut_down = *shared.shutdown_tx.borrow();
    let lost = match shared.lane(priority) {
        Some(lane) if !shut_down => lane.enqueue(task).await.err(),
        _ => Some(task),
    };
    if let Some(task) = lost {
        shared.stats.record_dropped(priority);
        task.complete(Err(SchedulerError::ShutDown));
    }
}
