//! Sending scheduler.
//!
//! cron から起動される 1 回のパス（`process()`）で、期限が来た sending queue を
//! ニュースレターの種類ごとに処理します。
//!
//! # 処理の流れ
//! 1. `scheduled_at <= now` の sending queue を取得し、`updated_at` を更新
//! 2. 各タスクの先頭で実行時間の予算をチェック（超過したらパス全体が失敗）
//! 3. ニュースレターを読み込み、種類ごとのハンドラへ dispatch
//!
//! タスク間のトランザクションはありません。各タスクの変更はそのタスクの
//! 処理中に保存されます。

mod config;
mod history;
mod policy;
mod verify;


pub use config::SchedulerConfig;
pub(crate) use config::{MAX_DELAY_MINS, MAX_EXECUTION_LIMIT_SECS, check_range};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::budget::ExecutionBudget;
use crate::domain::{
    Newsletter, NewsletterStatus, NewsletterType, ScheduledTask, SendTo, SubscriberId, TaskId,
    TaskType, WelcomeEvent,
};
use crate::error::SchedulerError;
use crate::ports::Ports;

pub struct Scheduler {
    ports: Ports,
    config: SchedulerConfig,
    budget: ExecutionBudget,
}

impl Scheduler {
    /// Start a pass whose budget runs from now.
    pub fn new(ports: Ports, config: SchedulerConfig) -> Self {
        let started_at = ports.clock.now();
        let budget = ExecutionBudget::new(started_at, config.execution_limit());
        Self {
            ports,
            config,
            budget,
        }
    }

    /// Start a pass whose budget began at `timer`.
    ///
    /// Fails with [`SchedulerError::ExecutionLimitReached`] if the budget is
    /// already spent.
    pub fn with_timer(
        ports: Ports,
        config: SchedulerConfig,
        timer: DateTime<Utc>,
    ) -> Result<Self, SchedulerError> {
        let budget = ExecutionBudget::new(timer, config.execution_limit());
        budget.enforce(ports.clock.now())?;
        Ok(Self {
            ports,
            config,
            budget,
        })
    }

    /// Move the start of the budget without re-checking it.
    pub fn reset_timer(&mut self, timer: DateTime<Utc>) {
        self.budget = ExecutionBudget::new(timer, self.config.execution_limit());
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.ports.clock.now()
    }

    /// Run one pass over all due sending queues.
    ///
    /// Returns `Ok(false)` when nothing was due. The budget is checked before
    /// each task; once it is spent no further task is attempted.
    pub async fn process(&self) -> Result<bool, SchedulerError> {
        let now = self.now();
        let tasks = self
            .ports
            .tasks
            .find_due(Some(TaskType::Sending), now)
            .await?;
        if tasks.is_empty() {
            debug!("no scheduled sending queues are due");
            return Ok(false);
        }

        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        self.ports.tasks.touch(&ids, now).await?;
        info!(count = tasks.len(), "processing due sending queues");

        for mut task in tasks {
            self.budget.enforce(self.now())?;
            task.updated_at = now;
            self.process_queue(task).await?;
        }
        Ok(true)
    }

    async fn process_queue(&self, task: ScheduledTask) -> Result<bool, SchedulerError> {
        let Some(newsletter_id) = task.newsletter_id else {
            warn!(task_id = %task.id, "sending queue without newsletter, deleting");
            self.delete_task(task.id).await?;
            return Ok(false);
        };

        let newsletter = match self.ports.newsletters.find(newsletter_id).await? {
            Some(newsletter) if !newsletter.is_deleted() => newsletter,
            _ => {
                info!(task_id = %task.id, newsletter_id = %newsletter_id, "newsletter is gone, deleting queue");
                self.delete_task(task.id).await?;
                return Ok(false);
            }
        };

        if !newsletter.accepts_sending() {
            debug!(
                task_id = %task.id,
                newsletter_id = %newsletter.id,
                status = ?newsletter.status,
                "newsletter is not active, skipping"
            );
            return Ok(false);
        }

        match newsletter.newsletter_type {
            NewsletterType::Welcome => self.process_welcome_newsletter(&newsletter, task).await,
            NewsletterType::Notification => {
                self.process_post_notification_newsletter(&newsletter, task)
                    .await
            }
            NewsletterType::Standard => {
                self.process_scheduled_standard_newsletter(newsletter, task)
                    .await
            }
            NewsletterType::Automatic => {
                self.process_scheduled_automatic_email(&newsletter, task)
                    .await
            }
            NewsletterType::NotificationHistory => {
                warn!(
                    task_id = %task.id,
                    newsletter_id = %newsletter.id,
                    "notification history cannot be scheduled directly, deleting queue"
                );
                self.delete_task(task.id).await?;
                Ok(false)
            }
        }
    }

    /// Welcome email: one subscriber, checked against the triggering event.
    pub async fn process_welcome_newsletter(
        &self,
        newsletter: &Newsletter,
        mut task: ScheduledTask,
    ) -> Result<bool, SchedulerError> {
        let Some(subscriber_id) = self.first_subscriber(task.id).await? else {
            debug!(task_id = %task.id, "welcome queue has no subscribers, deleting");
            self.delete_task(task.id).await?;
            return Ok(false);
        };

        // The verifiers delete or reschedule the task themselves on failure.
        let verified = match newsletter.options.event {
            Some(WelcomeEvent::User) => {
                self.verify_wordpress_subscriber(subscriber_id, newsletter, &task)
                    .await?
            }
            Some(WelcomeEvent::Segment) | None => {
                self.verify_mailpoet_subscriber(subscriber_id, newsletter, &task)
                    .await?
            }
        };
        if !verified {
            return Ok(false);
        }

        task.mark_ready(self.now());
        self.ports.tasks.save(&task).await?;
        info!(task_id = %task.id, newsletter_id = %newsletter.id, "welcome email queued");
        Ok(true)
    }

    /// Post-notification digest: snapshot the newsletter and send the
    /// snapshot to the segments.
    pub async fn process_post_notification_newsletter(
        &self,
        newsletter: &Newsletter,
        mut task: ScheduledTask,
    ) -> Result<bool, SchedulerError> {
        let subscriber_ids = self.resolve_segments(newsletter).await?;
        if subscriber_ids.is_empty() {
            debug!(
                task_id = %task.id,
                newsletter_id = %newsletter.id,
                "post notification has no recipients"
            );
            self.delete_queue_or_update_next_run_date(task, newsletter)
                .await?;
            return Ok(false);
        }

        let history = self.create_notification_history(newsletter.id).await?;
        self.ports
            .tasks
            .set_subscribers(task.id, &subscriber_ids)
            .await?;
        task.newsletter_id = Some(history.id);
        task.mark_ready(self.now());
        self.ports.tasks.save(&task).await?;

        info!(
            task_id = %task.id,
            newsletter_id = %newsletter.id,
            history_id = %history.id,
            recipients = subscriber_ids.len(),
            "post notification queued"
        );
        Ok(true)
    }

    /// Standard newsletter scheduled for a fixed time.
    pub async fn process_scheduled_standard_newsletter(
        &self,
        mut newsletter: Newsletter,
        mut task: ScheduledTask,
    ) -> Result<bool, SchedulerError> {
        let subscriber_ids = self.resolve_segments(&newsletter).await?;
        if subscriber_ids.is_empty() {
            debug!(
                task_id = %task.id,
                newsletter_id = %newsletter.id,
                "standard newsletter has no recipients"
            );
            self.delete_queue_or_update_next_run_date(task, &newsletter)
                .await?;
            return Ok(false);
        }

        let now = self.now();
        self.ports
            .tasks
            .set_subscribers(task.id, &subscriber_ids)
            .await?;
        task.mark_ready(now);
        self.ports.tasks.save(&task).await?;

        newsletter.set_status(NewsletterStatus::Sending, now);
        self.ports.newsletters.save(&newsletter).await?;

        info!(
            task_id = %task.id,
            newsletter_id = %newsletter.id,
            recipients = subscriber_ids.len(),
            "standard newsletter queued"
        );

        self.reschedule_bounce_task().await?;
        Ok(true)
    }

    /// Automatic email, sent either to its single subscriber or to a segment.
    pub async fn process_scheduled_automatic_email(
        &self,
        newsletter: &Newsletter,
        mut task: ScheduledTask,
    ) -> Result<bool, SchedulerError> {
        if newsletter.options.send_to == Some(SendTo::Segment) {
            let subscriber_ids = match newsletter.options.segment {
                Some(segment_id) => {
                    self.ports
                        .finder
                        .find_subscribers_in_segments(&[segment_id])
                        .await?
                }
                None => Vec::new(),
            };
            if subscriber_ids.is_empty() {
                debug!(task_id = %task.id, "automatic email segment is empty, deleting");
                self.delete_task(task.id).await?;
                return Ok(false);
            }
            self.ports
                .tasks
                .set_subscribers(task.id, &subscriber_ids)
                .await?;
        } else {
            let subscriber = match self.first_subscriber(task.id).await? {
                Some(id) => self.ports.subscribers.find_subscriber(id).await?,
                None => None,
            };
            if subscriber.is_none_or(|s| s.is_deleted()) {
                debug!(task_id = %task.id, "automatic email subscriber is gone, deleting");
                self.delete_task(task.id).await?;
                return Ok(false);
            }
        }

        task.mark_ready(self.now());
        self.ports.tasks.save(&task).await?;
        info!(task_id = %task.id, newsletter_id = %newsletter.id, "automatic email queued");
        Ok(true)
    }

    async fn resolve_segments(
        &self,
        newsletter: &Newsletter,
    ) -> Result<Vec<SubscriberId>, SchedulerError> {
        if newsletter.segment_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .ports
            .finder
            .find_subscribers_in_segments(&newsletter.segment_ids)
            .await?)
    }

    async fn first_subscriber(&self, task_id: TaskId) -> Result<Option<SubscriberId>, SchedulerError> {
        let rows = self.ports.tasks.get_subscribers(task_id, None).await?;
        Ok(rows.first().map(|row| row.subscriber_id))
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), SchedulerError> {
        self.ports.tasks.delete(task_id).await?;
        Ok(())
    }
}
