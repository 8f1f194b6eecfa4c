//! Subscriber lookups: records, segment membership and WordPress users.

use async_trait::async_trait;

use crate::domain::{SegmentId, Subscriber, SubscriberId, SubscriberSegment, WpUser, WpUserId};
use crate::error::StoreError;

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn find_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>, StoreError>;

    async fn find_membership(
        &self,
        subscriber_id: SubscriberId,
        segment_id: SegmentId,
    ) -> Result<Option<SubscriberSegment>, StoreError>;
}

/// Resolves the recipients of a set of segments.
#[async_trait]
pub trait SubscribersFinder: Send + Sync {
    /// Unique ids of subscribed, non-deleted subscribers with a subscribed
    /// membership in any of `segment_ids`.
    async fn find_subscribers_in_segments(
        &self,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<SubscriberId>, StoreError>;
}

#[async_trait]
pub trait WpUsers: Send + Sync {
    async fn get_user_by_id(&self, id: WpUserId) -> Result<Option<WpUser>, StoreError>;
}
