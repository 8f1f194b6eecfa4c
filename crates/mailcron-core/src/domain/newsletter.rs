//! Newsletters and their scheduling options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{NewsletterId, SegmentId};

/// Role option value meaning "any WordPress role".
pub const WORDPRESS_ALL_ROLES: &str = "mailpoet_all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsletterType {
    Standard,
    Welcome,
    /// Post-notification digest.
    Notification,
    /// Immutable snapshot of a [`NewsletterType::Notification`].
    NotificationHistory,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsletterStatus {
    Draft,
    Scheduled,
    Active,
    Sending,
    Sent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalType {
    Immediately,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    NthWeekDay,
}

/// What triggers a welcome email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WelcomeEvent {
    /// Subscriber joined a segment.
    Segment,
    /// A WordPress user was registered.
    User,
}

/// Recipient mode of an automatic email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendTo {
    User,
    Segment,
}

/// Per-type newsletter options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterOptions {
    pub interval_type: Option<IntervalType>,

    /// 5-field cron expression for recurring sends.
    pub schedule: Option<String>,

    pub event: Option<WelcomeEvent>,

    /// Required WordPress role, or [`WORDPRESS_ALL_ROLES`].
    pub role: Option<String>,

    /// Segment a welcome/automatic email is bound to.
    pub segment: Option<SegmentId>,

    pub send_to: Option<SendTo>,

    pub after_time_type: Option<String>,
    pub after_time_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: NewsletterId,
    pub newsletter_type: NewsletterType,
    pub status: NewsletterStatus,

    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub preheader: String,

    /// Renderable content, opaque to the scheduler.
    #[serde(default)]
    pub body: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NewsletterId>,

    /// Segments the newsletter is sent to.
    #[serde(default)]
    pub segment_ids: Vec<SegmentId>,

    #[serde(default)]
    pub options: NewsletterOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Newsletter {
    pub fn new(newsletter_type: NewsletterType, status: NewsletterStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: NewsletterId::UNASSIGNED,
            newsletter_type,
            status,
            subject: String::new(),
            preheader: String::new(),
            body: serde_json::Value::Null,
            parent_id: None,
            segment_ids: Vec::new(),
            options: NewsletterOptions::default(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Only active and scheduled newsletters have their queues processed.
    pub fn accepts_sending(&self) -> bool {
        matches!(self.status, NewsletterStatus::Active | NewsletterStatus::Scheduled)
    }

    /// Welcome and automatic emails are bound 1:1 to a single send.
    pub fn is_one_shot(&self) -> bool {
        matches!(
            self.newsletter_type,
            NewsletterType::Welcome | NewsletterType::Automatic
        )
    }

    /// Point-in-time copy used as the send-time content of a digest.
    ///
    /// The copy is unsaved; the caller inserts it.
    pub fn notification_history(&self, now: DateTime<Utc>) -> Newsletter {
        Newsletter {
            id: NewsletterId::UNASSIGNED,
            newsletter_type: NewsletterType::NotificationHistory,
            status: NewsletterStatus::Sending,
            subject: self.subject.clone(),
            preheader: self.preheader.clone(),
            body: self.body.clone(),
            parent_id: Some(self.id),
            segment_ids: self.segment_ids.clone(),
            options: self.options.clone(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: NewsletterStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
