//! In-progress guard for workers that may overlap.
//!
//! cron の起動は重なることがあるため、タスクの `meta.in_progress` に開始時刻を
//! 記録してから処理します。フラグの確認と設定は
//! [`TaskStore::claim_in_progress`] で 1 回のストア操作として行います。
//!
//! - フラグなし: フラグを立てて処理を実行
//! - フラグあり（`run_timeout` 以内）: 他のプロセスが実行中。何もせず `false`
//! - フラグあり（`run_timeout` 超過）: 前回の実行は落ちたとみなし、フラグを
//!   消して `reschedule_delay` 後に再スケジュール
//! - 処理がエラー: フラグを消してからエラーを返す
//!
//! 成功時はフラグを残します。タスクの完了（`ScheduledTask::complete`）で消えます。

use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};

use crate::domain::{InProgressClaim, ScheduledTask};
use crate::error::{SchedulerError, SyncError};
use crate::ports::{Clock, TaskStore};

#[derive(Clone)]
pub struct InProgressGuard {
    tasks: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    run_timeout: Duration,
    reschedule_delay: Duration,
}

impl InProgressGuard {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        run_timeout: Duration,
        reschedule_delay: Duration,
    ) -> Self {
        Self {
            tasks,
            clock,
            run_timeout,
            reschedule_delay,
        }
    }

    /// Run `work` unless another run holds the task.
    ///
    /// Returns `Ok(true)` when `work` ran and succeeded.
    pub async fn run<F, Fut>(&self, task: &ScheduledTask, work: F) -> Result<bool, SchedulerError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<(), SyncError>> + Send,
    {
        let now = self.clock.now();
        let claim = self
            .tasks
            .claim_in_progress(task.id, now, self.run_timeout, now + self.reschedule_delay)
            .await?;

        match claim {
            None => {
                debug!(task_id = %task.id, "task disappeared before processing");
                return Ok(false);
            }
            Some(InProgressClaim::Busy { since }) => {
                debug!(task_id = %task.id, since = %since, "task is already running");
                return Ok(false);
            }
            Some(InProgressClaim::Reclaimed { since }) => {
                warn!(task_id = %task.id, since = %since, "task ran too long, rescheduled");
                return Ok(false);
            }
            Some(InProgressClaim::Claimed) => {}
        }

        if let Err(err) = work().await {
            self.tasks
                .release_in_progress(task.id, self.clock.now())
                .await?;
            return Err(SchedulerError::Sync(err));
        }
        Ok(true)
    }
}
