//! Wall-clock execution budget.
//!
//! cron で起動される 1 回のパスは、開始時刻から `limit` を超えて
//! 処理を続けてはいけません。

use chrono::{DateTime, Duration, Utc};

use crate::error::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionBudget {
    started_at: DateTime<Utc>,
    limit: Duration,
}

impl ExecutionBudget {
    pub fn new(started_at: DateTime<Utc>, limit: Duration) -> Self {
        Self { started_at, limit }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        now - self.started_at >= self.limit
    }

    /// Fail with [`SchedulerError::ExecutionLimitReached`] once the budget is spent.
    pub fn enforce(&self, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        if self.is_exhausted(now) {
            return Err(SchedulerError::ExecutionLimitReached);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(19, false)]
    #[case(20, true)]
    #[case(300, true)]
    fn budget_is_spent_at_the_limit(#[case] elapsed_secs: i64, #[case] exhausted: bool) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let budget = ExecutionBudget::new(start, Duration::seconds(20));
        let now = start + Duration::seconds(elapsed_secs);

        assert_eq!(budget.is_exhausted(now), exhausted);
        assert_eq!(budget.enforce(now).is_err(), exhausted);
    }
}
