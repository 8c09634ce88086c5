use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Approval workflow counters
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub actions_attempted: AtomicU64,
    pub phases_advanced: AtomicU64,
    pub no_op_actions: AtomicU64,
    pub stale_retries: AtomicU64,
    pub invitations_purged: AtomicU64,
    pub comments_purged: AtomicU64,
    pub notifications_dispatched: AtomicU64,
    pub notifications_purged: AtomicU64,
    pub delivery_failures: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_action(&self) {
        self.actions_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_advance(&self) {
        self.phases_advanced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_op(&self) {
        self.no_op_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_retry(&self) {
        self.stale_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invitations_purged(&self, count: u64) {
        self.invitations_purged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_comments_purged(&self, count: u64) {
        self.comments_purged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_notifications(&self, count: u64) {
        self.notifications_dispatched
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_notifications_purged(&self, count: u64) {
        self.notifications_purged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            actions_attempted: self.actions_attempted.load(Ordering::Relaxed),
            phases_advanced: self.phases_advanced.load(Ordering::Relaxed),
            no_op_actions: self.no_op_actions.load(Ordering::Relaxed),
            stale_retries: self.stale_retries.load(Ordering::Relaxed),
            invitations_purged: self.invitations_purged.load(Ordering::Relaxed),
            comments_purged: self.comments_purged.load(Ordering::Relaxed),
            notifications_dispatched: self.notifications_dispatched.load(Ordering::Relaxed),
            notifications_purged: self.notifications_purged.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: actions={}, advanced={}, no_ops={}, stale_retries={}, invitations_purged={}, comments_purged={}, notifications={}, notifications_purged={}, delivery_failures={}",
            stats.actions_attempted,
            stats.phases_advanced,
            stats.no_op_actions,
            stats.stale_retries,
            stats.invitations_purged,
            stats.comments_purged,
            stats.notifications_dispatched,
            stats.notifications_purged,
            stats.delivery_failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStats {
    pub actions_attempted: u64,
    pub phases_advanced: u64,
    pub no_op_actions: u64,
    pub stale_retries: u64,
    pub invitations_purged: u64,
    pub comments_purged: u64,
    pub notifications_dispatched: u64,
    pub notifications_purged: u64,
    pub delivery_failures: u64,
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<WorkflowMetrics> =
    std::sync::LazyLock::new(WorkflowMetrics::new);

pub fn workflow_metrics() -> &'static WorkflowMetrics {
    &WORKFLOW_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
