//! Priority - scheduling class of a request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority class. Each class owns one lane.
///
/// `Immediate` requests bypass the queues and run on the caller's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Immediate,
    High,
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Immediate,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    /// Lanes that hold a queue and a worker loop.
    pub const QUEUED: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Immediate => "immediate",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    pub fn is_queued(self) -> bool {
        !matches!(self, Priority::Immediate)
    }

    /// Dense index, usable for per-lane arrays.
    pub fn index(self) -> usize {
        match self {
            Priority::Immediate => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_are_dense_and_ordered() {
        let idx: Vec<usize> = Priority::ALL.iter().map(|p| p.index()).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
        assert!(Priority::Immediate < Priority::Low);
    }

    #[test]
    fn only_immediate_is_unqueued() {
        assert!(!Priority::Immediate.is_queued());
        assert!(Priority::QUEUED.iter().all(|p| p.is_queued()));
    }
}
