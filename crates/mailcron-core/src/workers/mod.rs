//! Simple workers: one recurring task type, one strategy per task.
//!
//! A [`SimpleWorker`] only says what to do with a task. [`WorkerRunner`]
//! owns the task lifecycle: scheduling, picking up due tasks, the execution
//! budget and completion.

mod config;
mod progress;
mod woocommerce_sync;

pub use config::WorkerConfig;
pub use progress::InProgressGuard;
pub use woocommerce_sync::WooCommerceSync;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::budget::ExecutionBudget;
use crate::domain::{ScheduledTask, TaskStatus, TaskType};
use crate::error::SchedulerError;
use crate::ports::{Clock, TaskStore};

#[async_trait]
pub trait SimpleWorker: Send + Sync {
    fn task_type(&self) -> TaskType;

    /// Whether the worker can run at all on this install.
    fn check_processing_requirements(&self) -> bool {
        true
    }

    /// Process one task. `Ok(true)` completes it.
    async fn process_task_strategy(&self, task: &ScheduledTask) -> Result<bool, SchedulerError>;

    /// Due time of a freshly scheduled task.
    fn next_run_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now
    }
}

pub struct WorkerRunner<W> {
    worker: W,
    tasks: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    budget: ExecutionBudget,
}

impl<W: SimpleWorker> WorkerRunner<W> {
    pub fn new(
        worker: W,
        tasks: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        config: &WorkerConfig,
    ) -> Self {
        let budget = ExecutionBudget::new(clock.now(), config.execution_limit());
        Self {
            worker,
            tasks,
            clock,
            budget,
        }
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    /// Create the next task of this type unless one is already scheduled.
    pub async fn schedule(&self) -> Result<Option<ScheduledTask>, SchedulerError> {
        let task_type = self.worker.task_type();
        let now = self.clock.now();

        let due = self.tasks.find_due(Some(task_type), now).await?;
        let future = self.tasks.find_future_scheduled(task_type, now).await?;
        if !due.is_empty() || !future.is_empty() {
            debug!(task_type = %task_type, "task already scheduled");
            return Ok(None);
        }

        let task = ScheduledTask::new(task_type, now).with_scheduled_at(self.worker.next_run_date(now));
        let task = self.tasks.insert(task).await?;
        info!(task_id = %task.id, task_type = %task_type, "task scheduled");
        Ok(Some(task))
    }

    /// Process every due and ready task of this type.
    ///
    /// Returns `Ok(false)` when the requirements are not met.
    pub async fn process(&self) -> Result<bool, SchedulerError> {
        if !self.worker.check_processing_requirements() {
            debug!(task_type = %self.worker.task_type(), "processing requirements not met");
            return Ok(false);
        }

        let task_type = self.worker.task_type();
        let now = self.clock.now();
        let mut tasks = self.tasks.find_due(Some(task_type), now).await?;
        tasks.extend(self.tasks.find_ready(task_type).await?);

        for task in tasks {
            self.budget.enforce(self.clock.now())?;
            self.process_task(task).await?;
        }
        Ok(true)
    }

    async fn process_task(&self, mut task: ScheduledTask) -> Result<bool, SchedulerError> {
        if task.status != TaskStatus::Ready {
            task.mark_ready(self.clock.now());
            self.tasks.save(&task).await?;
        }

        if !self.worker.process_task_strategy(&task).await? {
            return Ok(false);
        }

        let mut done = self.tasks.find(task.id).await?.unwrap_or(task);
        done.complete(self.clock.now());
        self.tasks.save(&done).await?;
        info!(task_id = %done.id, task_type = %done.task_type, "task completed");
        Ok(true)
    }
}
