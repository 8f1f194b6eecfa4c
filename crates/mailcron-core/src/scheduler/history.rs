use tracing::info;

use super::Scheduler;
use crate::domain::{Newsletter, NewsletterId};
use crate::error::SchedulerError;

impl Scheduler {
    /// Freeze the current content of a newsletter for one digest send.
    ///
    /// Later edits to the live newsletter do not reach the snapshot.
    pub async fn create_notification_history(
        &self,
        newsletter_id: NewsletterId,
    ) -> Result<Newsletter, SchedulerError> {
        let Some(parent) = self.ports.newsletters.find(newsletter_id).await? else {
            return Err(SchedulerError::NewsletterNotFound(newsletter_id));
        };

        let history = self
            .ports
            .newsletters
            .insert(parent.notification_history(self.now()))
            .await?;
        info!(
            newsletter_id = %newsletter_id,
            history_id = %history.id,
            "notification history created"
        );
        Ok(history)
    }
}
