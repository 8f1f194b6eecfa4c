//! Subscribers, segments and WordPress users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{SegmentId, SubscriberId, WpUserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    Subscribed,
    Unconfirmed,
    Unsubscribed,
    Bounced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: String,
    pub status: SubscriberStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_user_id: Option<WpUserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Subscriber {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Confirmed, not unsubscribed, not bounced.
    pub fn is_confirmed(&self) -> bool {
        self.status == SubscriberStatus::Subscribed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Default,
    WpUsers,
    Woocommerce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub segment_type: SegmentType,
}

/// Membership row between a subscriber and a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberSegment {
    pub subscriber_id: SubscriberId,
    pub segment_id: SegmentId,
    pub status: SubscriberStatus,
}

impl SubscriberSegment {
    pub fn is_active(&self) -> bool {
        self.status == SubscriberStatus::Subscribed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WpUser {
    pub id: WpUserId,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl WpUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
