//! Live scheduler counters.
//!
//! Every worker updates these on task completion; all counters are atomics
//! so no lock is held across an await. Queue sizes are not stored here,
//! they are read from the lanes when a snapshot is taken.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::{Priority, RequestType};

#[derive(Debug, Default)]
struct LaneCounters {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

impl LaneCounters {
    fn snapshot(&self) -> LaneCounts {
        LaneCounts {
            tasks_started: self.started.load(Ordering::Relaxed),
            tasks_completed: self.completed.load(Ordering::Relaxed),
            tasks_failed: self.failed.load(Ordering::Relaxed),
            tasks_retried: self.retried.load(Ordering::Relaxed),
            tasks_dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneCounts {
    pub tasks_started: u64,
    pub tasks_completed: u64,
    /// Failed attempts, including ones that were retried.
    pub tasks_failed: u64,
    pub tasks_retried: u64,
    /// Tasks that never produced a success: final failures and tasks lost
    /// to shutdown.
    pub tasks_dropped: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCounts {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Aggregate totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_processing_time_ms: f64,
    pub average_processing_time_ms: f64,
}

/// Counters behind `apex/queueState`, per lane and per request type.
///
/// # Accounting
/// - `record_started`: a task was claimed (queued lanes) or began inline
///   (Immediate). A retried task is started once per attempt.
/// - `record_success` / `record_failure`: one finished attempt. Both count
///   towards `totalProcessed` and the processing time; only failures
///   count towards `totalFailed`.
/// - `record_retry`: a failed attempt was sent back to its lane.
/// - `record_dropped`: a task ended without success, either out of
///   retries or lost at shutdown.
///
/// # Thread Safety
/// - lane and aggregate counters are `AtomicU64` with relaxed ordering;
///   a snapshot may mix values from concurrent updates
/// - the per-type map sits behind a `parking_lot::Mutex` held only for the
///   increment
///
/// # Example
/// ```ignore
/// let stats = QueueStats::new();
/// stats.record_started(Priority::Normal, RequestType::Hover);
/// stats.record_failure(Priority::Normal, RequestType::Hover, Duration::from_millis(30));
/// stats.record_retry(Priority::Normal);
///
/// let totals = stats.snapshot();
/// assert_eq!((totals.total_processed, totals.total_failed), (1, 1));
/// ```
#[derive(Debug, Default)]
pub struct QueueStats {
    total_processed: AtomicU64,
    total_failed: AtomicU64,
    total_processing_micros: AtomicU64,
    lanes: [LaneCounters; 4],
    by_type: Mutex<HashMap<RequestType, TypeCounts>>,
    /// Bumped on every mutation; lets the publisher skip unchanged states.
    generation: AtomicU64,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, priority: Priority) -> &LaneCounters {
        &self.lanes[priority.index()]
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_started(&self, priority: Priority, request_type: RequestType) {
        self.lane(priority).started.fetch_add(1, Ordering::Relaxed);
        self.by_type.lock().entry(request_type).or_default().started += 1;
        self.bump();
    }

    pub fn record_success(&self, priority: Priority, request_type: RequestType, elapsed: Duration) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.add_processing_time(elapsed);
        self.lane(priority).completed.fetch_add(1, Ordering::Relaxed);
        self.by_type.lock().entry(request_type).or_default().completed += 1;
        self.bump();
    }

    /// A failed attempt. Counted as processed, whether or not it is retried.
    pub fn record_failure(&self, priority: Priority, request_type: RequestType, elapsed: Duration) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.total_failed.fetch_add(1, Ordering::Relaxed);
        self.add_processing_time(elapsed);
        self.lane(priority).failed.fetch_add(1, Ordering::Relaxed);
        self.by_type.lock().entry(request_type).or_default().failed += 1;
        self.bump();
    }

    pub fn record_retry(&self, priority: Priority) {
        self.lane(priority).retried.fetch_add(1, Ordering::Relaxed);
        self.bump();
    }

    pub fn record_dropped(&self, priority: Priority) {
        self.lane(priority).dropped.fetch_add(1, Ordering::Relaxed);
        self.bump();
    }

    fn add_processing_time(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_processing_micros
            .fetch_add(micros, Ordering::Relaxed);
    }

    /// Bumped on every record call. Two equal readings mean nothing changed
    /// in between.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total_processed = self.total_processed.load(Ordering::Relaxed);
        let total_processing_time_ms =
            self.total_processing_micros.load(Ordering::Relaxed) as f64 / 1000.0;
        let average_processing_time_ms = if total_processed == 0 {
            0.0
        } else {
            total_processing_time_ms / total_processed as f64
        };
        StatsSnapshot {
            total_processed,
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_processing_time_ms,
            average_processing_time_ms,
        }
    }

    pub fn lane_counts(&self, priority: Priority) -> LaneCounts {
        self.lane(priority).snapshot()
    }

    pub fn type_breakdown(&self) -> HashMap<RequestType, TypeCounts> {
        self.by_type.lock().clone()
    }
}
