//! Point-in-time scheduler metrics for external export.

use std::sync::atomic::AtomicU64;

use serde::Serialize;

/// Monotonic counters bumped by the scheduler component.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    /// Sends handed to the transport (immediate and scheduled).
    pub dispatched: AtomicU64,
    /// Transitions suppressed by the eligibility engine.
    pub suppressed: AtomicU64,
}

/// JSON-serializable snapshot of the scheduler's gauges and counters.
///
/// Taken under the scheduler lock only for the snapshot duration.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerMetrics {
    /// Notifications waiting in the schedule queue.
    pub idle: usize,
    /// Notifications currently handed to asynchronous execution.
    pub in_flight: usize,
    /// Total sends submitted since start.
    pub dispatched_total: u64,
    /// Total transitions suppressed since start.
    pub suppressed_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_for_export() {
        let snapshot = SchedulerMetrics {
            idle: 3,
            in_flight: 1,
            dispatched_total: 42,
            suppressed_total: 7,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["idle"], 3);
        assert_eq!(json["in_flight"], 1);
        assert_eq!(json["dispatched_total"], 42);
    }
}
