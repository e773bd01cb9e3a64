//! `apex/queueState` request params and report shape.
//!
//! The same report is pushed as `apex/queueStateChanged`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, RequestType};
use crate::queue::{ActiveTaskView, TypeCounts};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueStateParams {
    pub include_request_type_breakdown: bool,
    pub include_utilization: bool,
    pub include_active_tasks: bool,
}

impl QueueStateParams {
    pub fn everything() -> Self {
        Self {
            include_request_type_breakdown: true,
            include_utilization: true,
            include_active_tasks: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMetrics {
    pub queue_sizes: BTreeMap<Priority, usize>,
    pub active_task_counts: BTreeMap<Priority, usize>,
    pub tasks_started: BTreeMap<Priority, u64>,
    pub tasks_completed: BTreeMap<Priority, u64>,
    pub tasks_failed: BTreeMap<Priority, u64>,
    pub tasks_retried: BTreeMap<Priority, u64>,
    pub tasks_dropped: BTreeMap<Priority, u64>,
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_processing_time_ms: f64,
    pub average_processing_time_ms: f64,
    pub active_workers: usize,
    pub background_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type_breakdown: Option<BTreeMap<RequestType, TypeCounts>>,
    /// Active tasks over the concurrency ceiling, per queued lane.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization: Option<BTreeMap<Priority, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_tasks: Option<Vec<ActiveTaskView>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub timestamp: DateTime<Utc>,
    /// Time spent building this report.
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStateReport {
    pub metrics: QueueMetrics,
    pub metadata: ReportMetadata,
}
