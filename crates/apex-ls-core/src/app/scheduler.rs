//! PriorityRequestScheduler - four priority lanes with bounded concurrency.
//!
//! # Flow
//! 1. `submit` looks up the request type's policy (registry, then overrides)
//! 2. Immediate: the handler runs on the caller's task, no retry
//! 3. Otherwise the task is pushed onto its lane (waiting while the lane is full)
//! 4. The lane's worker loop claims it and forks execution (see `lane_worker`)
//! 5. The submitter's future resolves with the final result

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::lane_worker;
use crate::config::SchedulerSettings;
use crate::domain::{Priority, RequestType};
use crate::error::SchedulerError;
use crate::observability::{QueueMetrics, QueueStateParams, QueueStateReport, ReportMetadata};
use crate::ports::{Clock, IdGenerator};
use crate::queue::{Lane, QueueStats, RequestTask, RetryPolicy, StatsSnapshot, TaskResult};
use crate::registry::{PolicyOverrides, ServiceRegistry};

/// State shared between the scheduler handle, the worker loops and the
/// forked executions.
pub(crate) struct SchedulerShared {
    pub(crate) registry: Arc<ServiceRegistry>,
    pub(crate) settings: SchedulerSettings,
    pub(crate) retry: RetryPolicy,
    pub(crate) stats: QueueStats,
    lanes: Vec<Arc<Lane>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    pub(crate) ready_tx: watch::Sender<bool>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    immediate_in_flight: AtomicUsize,
}

impl SchedulerShared {
    pub(crate) fn lane(&self, priority: Priority) -> Option<&Arc<Lane>> {
        self.lanes.iter().find(|l| l.priority() == priority)
    }

    /// Run one attempt of `task`: handler lookup plus the timeout race.
    pub(crate) async fn execute_attempt(&self, task: &RequestTask) -> (TaskResult, Duration) {
        let started = Instant::now();
        let request_type = task.request_type;

        let Some(handler) = self.registry.get_handler(request_type) else {
            return (
                Err(SchedulerError::HandlerNotRegistered(request_type)),
                started.elapsed(),
            );
        };

        let result = match tokio::time::timeout(task.timeout, handler.handle(task.params.clone()))
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into_scheduler_error(request_type)),
            Err(_elapsed) => Err(SchedulerError::RequestTimeout {
                request_type,
                timeout: task.timeout,
            }),
        };
        (result, started.elapsed())
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Handle to a running scheduler. Construct it with `SchedulerBuilder`.
pub struct PriorityRequestScheduler {
    shared: Arc<SchedulerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PriorityRequestScheduler {
    /// Spawn one worker loop per queued lane. Must run inside a tokio runtime.
    pub(crate) fn start(
        registry: Arc<ServiceRegistry>,
        settings: SchedulerSettings,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Arc<Self> {
        let lanes: Vec<Arc<Lane>> = Priority::QUEUED
            .into_iter()
            .map(|priority| {
                Arc::new(Lane::new(
                    priority,
                    settings.queue_capacity.get(priority).unwrap_or(1),
                    settings.max_concurrency.get(priority).unwrap_or(1),
                ))
            })
            .collect();

        let (ready_tx, _) = watch::channel(settings.background_ready);
        let (shutdown_tx, _) = watch::channel(false);

        let shared = Arc::new(SchedulerShared {
            registry,
            retry: settings.retry.policy(),
            settings,
            stats: QueueStats::new(),
            lanes,
            clock,
            ids,
            ready_tx,
            shutdown_tx,
            immediate_in_flight: AtomicUsize::new(0),
        });

        let workers = shared
            .lanes
            .iter()
            .filter_map(|lane| {
                let rx = lane.take_receiver()?;
                Some(tokio::spawn(lane_worker::run(
                    Arc::clone(&shared),
                    Arc::clone(lane),
                    rx,
                )))
            })
            .collect();

        tracing::info!(
            high = shared.settings.max_concurrency.high,
            normal = shared.settings.max_concurrency.normal,
            low = shared.settings.max_concurrency.low,
            "scheduler started"
        );

        Arc::new(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Submit a request and wait for its final result.
    ///
    /// The policy is the handler's defaults, overridden by the registration
    /// overrides and then by `overrides`.
    ///
    /// # Lanes
    /// - `Immediate`: runs on the caller's task right away. No queue and no
    ///   retry: a failure is returned as is.
    /// - `High` / `Normal` / `Low`: pushed onto the lane. Waits for room when
    ///   the lane is full. Failed attempts that are retriable come back after
    ///   `100ms * 2^(k-1)`, up to `max_retries` times.
    ///
    /// # Errors
    /// - `HandlerNotRegistered`: nothing handles `request_type`; checked
    ///   before anything is queued
    /// - `RequestTimeout` / `HandlerExecution`: the last attempt's failure
    /// - `ShutDown`: the scheduler stopped before the task finished
    ///
    /// # Example
    /// ```ignore
    /// let hover = scheduler
    ///     .submit(
    ///         RequestType::Hover,
    ///         json!({ "symbol": "Account" }),
    ///         PolicyOverrides::none().timeout(Duration::from_millis(500)),
    ///     )
    ///     .await?;
    /// ```
    pub async fn submit(
        &self,
        request_type: RequestType,
        params: serde_json::Value,
        overrides: PolicyOverrides,
    ) -> TaskResult {
        if self.is_shut_down() {
            return Err(SchedulerError::ShutDown);
        }
        let shared = &self.shared;
        if !shared.registry.has_handler(request_type) {
            return Err(SchedulerError::HandlerNotRegistered(request_type));
        }

        let policy = shared.registry.policy(request_type).with_overrides(&overrides);
        let (task, rx) = RequestTask::new(
            shared.ids.generate_task_id(),
            request_type,
            policy.priority,
            params,
            shared.clock.now(),
            policy.timeout,
            policy.max_retries,
        );

        let Some(lane) = shared.lane(policy.priority) else {
            return self.run_immediate(task).await;
        };

        tracing::trace!(task_id = %task.id, %request_type, lane = %lane.priority(), "enqueue");
        if lane.enqueue(task).await.is_err() {
            return Err(SchedulerError::ShutDown);
        }
        // The responder is dropped without a result only when the task is
        // lost: lane closed at shutdown, or the execution panicked.
        rx.await.unwrap_or(Err(SchedulerError::ShutDown))
    }

    /// `submit` with typed params and result.
    pub async fn submit_typed<P, R>(
        &self,
        request_type: RequestType,
        params: &P,
        overrides: PolicyOverrides,
    ) -> Result<R, SchedulerError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)
            .map_err(|e| SchedulerError::InvalidParams(e.to_string()))?;
        let value = self.submit(request_type, params, overrides).await?;
        serde_json::from_value(value).map_err(|e| SchedulerError::HandlerExecution {
            request_type,
            message: format!("decoding result: {e}"),
        })
    }

    async fn run_immediate(&self, mut task: RequestTask) -> TaskResult {
        let shared = &self.shared;
        let _in_flight = InFlight::enter(&shared.immediate_in_flight);
        task.mark_started();
        shared.stats.record_started(Priority::Immediate, task.request_type);

        let (result, elapsed) = shared.execute_attempt(&task).await;
        match &result {
            Ok(_) => {
                shared
                    .stats
                    .record_success(Priority::Immediate, task.request_type, elapsed);
            }
            Err(err) => {
                shared
                    .stats
                    .record_failure(Priority::Immediate, task.request_type, elapsed);
                shared.stats.record_dropped(Priority::Immediate);
                tracing::warn!(task_id = %task.id, request_type = %task.request_type, error = %err, "immediate request failed");
            }
        }
        result
    }

    /// Open or close the gate lane workers wait on before claiming work.
    pub fn set_background_ready(&self, ready: bool) {
        self.shared.ready_tx.send_replace(ready);
        tracing::debug!(ready, "background processing gate");
    }

    pub fn is_background_ready(&self) -> bool {
        *self.shared.ready_tx.borrow()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Changes whenever any counter changes.
    pub fn stats_generation(&self) -> u64 {
        self.shared.stats.generation()
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.shared.registry
    }

    pub fn queue_size(&self, priority: Priority) -> usize {
        self.shared.lane(priority).map_or(0, |l| l.queued())
    }

    /// Tasks executing right now in `priority`'s lane.
    pub fn active_count(&self, priority: Priority) -> usize {
        match self.shared.lane(priority) {
            Some(lane) => lane.active_count(),
            None => self.shared.immediate_in_flight.load(Ordering::Relaxed),
        }
    }

    /// One per lane: the live queued-lane loops plus the Immediate path,
    /// which runs inline on the submitter and is live until shutdown.
    pub fn active_workers(&self) -> usize {
        let loops = self.workers.lock().iter().filter(|w| !w.is_finished()).count();
        loops + usize::from(!self.is_shut_down())
    }

    /// Build the `apex/queueState` report.
    pub fn queue_state(&self, params: &QueueStateParams) -> QueueStateReport {
        let started = Instant::now();
        let shared = &self.shared;
        let totals = shared.stats.snapshot();

        let per_lane = |f: &dyn Fn(Priority) -> u64| -> BTreeMap<Priority, u64> {
            Priority::ALL.into_iter().map(|p| (p, f(p))).collect()
        };
        let counts = |p: Priority| shared.stats.lane_counts(p);

        let metrics = QueueMetrics {
            queue_sizes: Priority::ALL
                .into_iter()
                .map(|p| (p, self.queue_size(p)))
                .collect(),
            active_task_counts: Priority::ALL
                .into_iter()
                .map(|p| (p, self.active_count(p)))
                .collect(),
            tasks_started: per_lane(&|p| counts(p).tasks_started),
            tasks_completed: per_lane(&|p| counts(p).tasks_completed),
            tasks_failed: per_lane(&|p| counts(p).tasks_failed),
            tasks_retried: per_lane(&|p| counts(p).tasks_retried),
            tasks_dropped: per_lane(&|p| counts(p).tasks_dropped),
            total_processed: totals.total_processed,
            total_failed: totals.total_failed,
            total_processing_time_ms: totals.total_processing_time_ms,
            average_processing_time_ms: totals.average_processing_time_ms,
            active_workers: self.active_workers(),
            background_ready: self.is_background_ready(),
            request_type_breakdown: params
                .include_request_type_breakdown
                .then(|| shared.stats.type_breakdown().into_iter().collect()),
            utilization: params.include_utilization.then(|| {
                shared
                    .lanes
                    .iter()
                    .map(|l| {
                        (
                            l.priority(),
                            l.active_count() as f64 / l.max_concurrency() as f64,
                        )
                    })
                    .collect()
            }),
            active_tasks: params
                .include_active_tasks
                .then(|| shared.lanes.iter().flat_map(|l| l.active_tasks()).collect()),
        };

        QueueStateReport {
            metrics,
            metadata: ReportMetadata {
                timestamp: shared.clock.now(),
                processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            },
        }
    }

    /// Serve a raw `apex/queueState` request.
    pub fn handle_queue_state_request(
        &self,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, SchedulerError> {
        let params: QueueStateParams = if params.is_null() {
            QueueStateParams::default()
        } else {
            serde_json::from_value(params)
                .map_err(|e| SchedulerError::InvalidParams(e.to_string()))?
        };
        serde_json::to_value(self.queue_state(&params))
            .map_err(|e| SchedulerError::InvalidParams(e.to_string()))
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shared.shutdown_tx.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shared.shutdown_tx.borrow()
    }

    /// Stop every worker loop and close the lanes.
    ///
    /// Best effort: queued tasks are dropped and their submitters see
    /// `ShutDown`; executions already forked are abandoned, not drained.
    pub fn shutdown(&self) {
        if self.shared.shutdown_tx.send_replace(true) {
            return;
        }
        for worker in self.workers.lock().drain(..) {
            worker.abort();
        }
        for lane in &self.shared.lanes {
            let lost = lane.queued() as u64;
            for _ in 0..lost {
                self.shared.stats.record_dropped(lane.priority());
            }
        }
        tracing::info!("scheduler shut down");
    }
}

impl Drop for PriorityRequestScheduler {
    fn drop(&mut self) {
        for worker in self.workers.get_mut().drain(..) {
            worker.abort();
        }
    }
}
