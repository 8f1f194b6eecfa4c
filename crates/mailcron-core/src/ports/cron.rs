//! CronEvaluator port.

use chrono::{DateTime, Utc};

/// Computes the next firing time of a cron schedule.
pub trait CronEvaluator: Send + Sync {
    /// First firing time strictly after `from`, or `None` if `expr` is
    /// invalid or never fires again.
    fn next_run_after(&self, expr: &str, from: DateTime<Utc>) -> Option<DateTime<Utc>>;
}
