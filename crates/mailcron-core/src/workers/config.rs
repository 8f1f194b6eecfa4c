//! Simple worker configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scheduler::{MAX_DELAY_MINS, MAX_EXECUTION_LIMIT_SECS, check_range};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Wall-clock budget of one runner pass, in seconds.
    #[serde(default = "default_execution_limit")]
    pub execution_limit_secs: u64,
    /// An in-progress flag older than this is considered abandoned.
    #[serde(default = "default_task_run_timeout")]
    pub task_run_timeout_mins: u32,
    /// Delay applied to a task reclaimed from an abandoned run.
    #[serde(default = "default_timed_out_reschedule")]
    pub timed_out_reschedule_mins: u32,
}

fn default_execution_limit() -> u64 {
    20
}

fn default_task_run_timeout() -> u32 {
    120
}

fn default_timed_out_reschedule() -> u32 {
    5
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            execution_limit_secs: default_execution_limit(),
            task_run_timeout_mins: default_task_run_timeout(),
            timed_out_reschedule_mins: default_timed_out_reschedule(),
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "execution_limit_secs",
            self.execution_limit_secs,
            MAX_EXECUTION_LIMIT_SECS,
        )?;
        check_range(
            "task_run_timeout_mins",
            self.task_run_timeout_mins.into(),
            MAX_DELAY_MINS.into(),
        )?;
        check_range(
            "timed_out_reschedule_mins",
            self.timed_out_reschedule_mins.into(),
            MAX_DELAY_MINS.into(),
        )
    }

    pub fn execution_limit(&self) -> Duration {
        let secs = self.execution_limit_secs.min(MAX_EXECUTION_LIMIT_SECS);
        Duration::seconds(secs as i64)
    }

    pub fn task_run_timeout(&self) -> Duration {
        Duration::minutes(self.task_run_timeout_mins.min(MAX_DELAY_MINS).into())
    }

    pub fn timed_out_reschedule(&self) -> Duration {
        Duration::minutes(self.timed_out_reschedule_mins.min(MAX_DELAY_MINS).into())
    }
}
