//! Reschedule/deletion policy and the bounce task pull-in.

use chrono::Duration;
use rand::Rng;
use tracing::{debug, info, warn};

use super::Scheduler;
use crate::domain::{IntervalType, Newsletter, ScheduledTask, TaskType};
use crate::error::SchedulerError;

impl Scheduler {
    /// Delete a queue that cannot run now, or move it to the next firing of
    /// the newsletter's schedule.
    ///
    /// `immediately` newsletters are one-off: the queue is deleted, and for
    /// welcome and automatic emails the newsletter with it. Recurring queues
    /// move to `next_run_after(schedule, max(now, scheduled_at))`; a missing
    /// or unparseable schedule deletes the queue.
    pub async fn delete_queue_or_update_next_run_date(
        &self,
        mut task: ScheduledTask,
        newsletter: &Newsletter,
    ) -> Result<(), SchedulerError> {
        if newsletter.options.interval_type == Some(IntervalType::Immediately) {
            self.delete_task(task.id).await?;
            if newsletter.is_one_shot() {
                self.ports.newsletters.delete(newsletter.id).await?;
            }
            info!(
                task_id = %task.id,
                newsletter_id = %newsletter.id,
                "immediate newsletter queue deleted"
            );
            return Ok(());
        }

        let now = self.now();
        let from = task.scheduled_at.map_or(now, |at| at.max(now));
        let next = newsletter
            .options
            .schedule
            .as_deref()
            .and_then(|schedule| self.ports.cron.next_run_after(schedule, from));

        match next {
            Some(at) => {
                task.reschedule(at, now);
                self.ports.tasks.save(&task).await?;
                debug!(task_id = %task.id, scheduled_at = %at, "queue rescheduled");
            }
            None => {
                warn!(
                    task_id = %task.id,
                    newsletter_id = %newsletter.id,
                    "newsletter has no usable schedule, deleting queue"
                );
                self.delete_task(task.id).await?;
            }
        }
        Ok(())
    }

    /// Pull the next bounce check closer after a campaign goes out.
    ///
    /// Only the earliest future bounce task is considered, and only when it
    /// is due later than `bounce_max_delay` from now.
    pub async fn reschedule_bounce_task(&self) -> Result<(), SchedulerError> {
        let now = self.now();
        let bounce = self
            .ports
            .tasks
            .find_future_scheduled(TaskType::Bounce, now)
            .await?
            .into_iter()
            .next();
        let Some(mut bounce) = bounce else {
            return Ok(());
        };

        let limit = now + self.config.bounce_max_delay();
        if bounce.scheduled_at.is_none_or(|at| at <= limit) {
            return Ok(());
        }

        let at = now + self.config.bounce_target_delay() + self.bounce_jitter();
        bounce.reschedule(at, now);
        self.ports.tasks.save(&bounce).await?;
        info!(task_id = %bounce.id, scheduled_at = %at, "bounce task pulled in");
        Ok(())
    }

    fn bounce_jitter(&self) -> Duration {
        let spread = self.config.bounce_jitter().num_seconds();
        if spread <= 0 {
            return Duration::zero();
        }
        Duration::seconds(rand::thread_rng().gen_range(-spread..spread))
    }
}
