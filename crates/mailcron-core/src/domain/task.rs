//! Scheduled tasks and sending queues.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{NewsletterId, SubscriberId, TaskId};
use super::meta::TaskMeta;

/// What kind of deferred work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// A newsletter send (a "sending queue").
    Sending,
    /// Bounce-address synchronisation.
    Bounce,
    /// WooCommerce customer synchronisation.
    WoocommerceSync,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Sending => "sending",
            TaskType::Bounce => "bounce",
            TaskType::WoocommerceSync => "woocommerce_sync",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status.
///
/// State transitions:
/// - Scheduled -> Ready (picked up by the scheduler or a worker)
/// - Scheduled -> Scheduled (rescheduled to a later `scheduled_at`)
/// - Ready -> Completed
/// - Ready -> Scheduled (stale in-progress task reclaimed)
///
/// `Ready` is stored as a NULL status in the relational schema: the task is
/// being worked on, or is ready for the sending worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Scheduled,
    Ready,
    Paused,
    Completed,
}

/// A unit of deferred work with a due time.
///
/// A task of type [`TaskType::Sending`] with a `newsletter_id` is a sending
/// queue; its recipients live in the task store as [`TaskSubscriber`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub task_type: TaskType,
    pub status: TaskStatus,

    /// Due time. `None` means "not scheduled for a specific time".
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "TaskMeta::is_empty")]
    pub meta: TaskMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newsletter_id: Option<NewsletterId>,
}

impl ScheduledTask {
    pub fn new(task_type: TaskType, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::UNASSIGNED,
            task_type,
            status: TaskStatus::Scheduled,
            scheduled_at: None,
            created_at: now,
            updated_at: now,
            meta: TaskMeta::new(),
            newsletter_id: None,
        }
    }

    /// Create a sending queue for a newsletter.
    pub fn sending(newsletter_id: NewsletterId, now: DateTime<Utc>) -> Self {
        let mut task = Self::new(TaskType::Sending, now);
        task.newsletter_id = Some(newsletter_id);
        task
    }

    pub fn with_scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Scheduled with a due time at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Scheduled && self.scheduled_at.is_some_and(|at| at <= now)
    }

    /// Mark as ready for dispatch (NULL status in the relational schema).
    pub fn mark_ready(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Ready;
        self.updated_at = now;
    }

    /// Push the due time to `at` and put the task back in the schedule.
    pub fn reschedule(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) {
        self.status = TaskStatus::Scheduled;
        self.scheduled_at = Some(at);
        self.updated_at = now;
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.meta.clear_in_progress();
        self.updated_at = now;
    }

    /// Take the in-progress flag for a run starting at `now`.
    ///
    /// A flag older than `run_timeout` belongs to a run that died: it is
    /// cleared and the task goes back to the schedule at `reclaim_at`.
    /// Stores call this under the same lock as the write.
    pub fn claim_in_progress(
        &mut self,
        now: DateTime<Utc>,
        run_timeout: Duration,
        reclaim_at: DateTime<Utc>,
    ) -> InProgressClaim {
        match self.meta.in_progress_since() {
            None => {
                self.meta.set_in_progress(now);
                self.updated_at = now;
                InProgressClaim::Claimed
            }
            Some(since) if now - since <= run_timeout => InProgressClaim::Busy { since },
            Some(since) => {
                self.meta.clear_in_progress();
                self.reschedule(reclaim_at, now);
                InProgressClaim::Reclaimed { since }
            }
        }
    }
}

/// Outcome of [`ScheduledTask::claim_in_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InProgressClaim {
    /// The flag was free and now belongs to the caller.
    Claimed,
    /// Another run set the flag at `since` and is still within its timeout.
    Busy { since: DateTime<Utc> },
    /// A stale flag from `since` was cleared and the task rescheduled.
    Reclaimed { since: DateTime<Utc> },
}

/// Per-subscriber processing status within a sending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Unprocessed,
    Processing,
    Processed,
}

/// Association between a sending queue and one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSubscriber {
    pub task_id: TaskId,
    pub subscriber_id: SubscriberId,
    pub status: ProcessingStatus,
    #[serde(default)]
    pub failed: bool,
}

impl TaskSubscriber {
    pub fn unprocessed(task_id: TaskId, subscriber_id: SubscriberId) -> Self {
        Self {
            task_id,
            subscriber_id,
            status: ProcessingStatus::Unprocessed,
            failed: false,
        }
    }
}
