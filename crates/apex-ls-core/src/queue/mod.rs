//! Queue module: lanes, task records, retry policy and live counters.

mod lane;
mod record;
mod retry;
mod stats;

pub use lane::{ActiveTask, ActiveTaskView, Lane, SlotGuard};
pub use record::{RequestTask, TaskResult};
pub use retry::RetryPolicy;
pub use stats::{LaneCounts, QueueStats, StatsSnapshot, TypeCounts};
