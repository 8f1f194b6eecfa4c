//! Eligibility verifiers for single-recipient sends.
//!
//! A WordPress role mismatch is permanent and deletes the queue. An inactive
//! segment membership may resolve once the subscriber confirms, so that case
//! reschedules instead.

use tracing::{debug, info};

use super::Scheduler;
use crate::domain::{Newsletter, ScheduledTask, SubscriberId, WORDPRESS_ALL_ROLES};
use crate::error::SchedulerError;

impl Scheduler {
    /// Check that the subscriber is a WordPress user holding the newsletter's
    /// role. Deletes the task and returns `false` otherwise.
    pub async fn verify_wordpress_subscriber(
        &self,
        subscriber_id: SubscriberId,
        newsletter: &Newsletter,
        task: &ScheduledTask,
    ) -> Result<bool, SchedulerError> {
        let wp_user_id = self
            .ports
            .subscribers
            .find_subscriber(subscriber_id)
            .await?
            .filter(|s| !s.is_deleted())
            .and_then(|s| s.wp_user_id);
        let user = match wp_user_id {
            Some(id) => self.ports.wp_users.get_user_by_id(id).await?,
            None => None,
        };
        let Some(user) = user else {
            info!(
                task_id = %task.id,
                subscriber_id = %subscriber_id,
                "subscriber is not a WordPress user, deleting queue"
            );
            self.delete_task(task.id).await?;
            return Ok(false);
        };

        if let Some(role) = newsletter.options.role.as_deref()
            && role != WORDPRESS_ALL_ROLES
            && !user.has_role(role)
        {
            info!(
                task_id = %task.id,
                wp_user_id = %user.id,
                role,
                "WordPress user lacks the required role, deleting queue"
            );
            self.delete_task(task.id).await?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Check that the subscriber is an active member of the newsletter's
    /// segment.
    ///
    /// Unknown subscribers and subscribers outside the segment delete the
    /// task. A membership that is not active yet reschedules it by the
    /// configured backoff. There is no cap on how often that happens.
    pub async fn verify_mailpoet_subscriber(
        &self,
        subscriber_id: SubscriberId,
        newsletter: &Newsletter,
        task: &ScheduledTask,
    ) -> Result<bool, SchedulerError> {
        let subscriber = self
            .ports
            .subscribers
            .find_subscriber(subscriber_id)
            .await?
            .filter(|s| !s.is_deleted());
        let Some(subscriber) = subscriber else {
            info!(task_id = %task.id, subscriber_id = %subscriber_id, "subscriber not found, deleting queue");
            self.delete_task(task.id).await?;
            return Ok(false);
        };

        let membership = match newsletter.options.segment {
            Some(segment_id) => {
                self.ports
                    .subscribers
                    .find_membership(subscriber_id, segment_id)
                    .await?
            }
            None => None,
        };
        let Some(membership) = membership else {
            info!(
                task_id = %task.id,
                subscriber_id = %subscriber_id,
                "subscriber is not in the newsletter segment, deleting queue"
            );
            self.delete_task(task.id).await?;
            return Ok(false);
        };

        if !membership.is_active() || !subscriber.is_confirmed() {
            let now = self.now();
            let at = now + self.config.reschedule_backoff();
            let mut task = task.clone();
            task.reschedule(at, now);
            self.ports.tasks.save(&task).await?;
            debug!(
                task_id = %task.id,
                subscriber_id = %subscriber_id,
                scheduled_at = %at,
                "subscription not active yet, rescheduled"
            );
            return Ok(false);
        }

        Ok(true)
    }
}
