//! InMemoryDirectory - newsletters, subscribers, segments と WordPress users
//!
//! NewsletterStore / SubscriberStore / SubscribersFinder / WpUsers を
//! 1 つのアリーナでまとめて実装します。

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{
    Newsletter, NewsletterId, NewsletterType, Segment, SegmentId, Subscriber, SubscriberId,
    SubscriberSegment, WpUser, WpUserId,
};
use crate::error::StoreError;
use crate::ports::{NewsletterStore, SubscriberStore, SubscribersFinder, WpUsers};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySnapshot {
    pub newsletters: Vec<Newsletter>,
    pub subscribers: Vec<Subscriber>,
    pub segments: Vec<Segment>,
    pub subscriber_segments: Vec<SubscriberSegment>,
    pub wp_users: Vec<WpUser>,
}

#[derive(Default)]
struct DirectoryState {
    newsletters: BTreeMap<NewsletterId, Newsletter>,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
    segments: BTreeMap<SegmentId, Segment>,
    memberships: BTreeMap<(SubscriberId, SegmentId), SubscriberSegment>,
    wp_users: BTreeMap<WpUserId, WpUser>,
    next_newsletter_id: u64,
}

impl DirectoryState {
    fn allocate_newsletter_id(&mut self) -> NewsletterId {
        self.next_newsletter_id = self.next_newsletter_id.max(1);
        let id = NewsletterId::new(self.next_newsletter_id);
        self.next_newsletter_id += 1;
        id
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        let mut state = DirectoryState {
            next_newsletter_id: 1,
            ..DirectoryState::default()
        };
        for newsletter in snapshot.newsletters {
            state.next_newsletter_id = state.next_newsletter_id.max(newsletter.id.value() + 1);
            state.newsletters.insert(newsletter.id, newsletter);
        }
        state.subscribers = snapshot.subscribers.into_iter().map(|s| (s.id, s)).collect();
        state.segments = snapshot.segments.into_iter().map(|s| (s.id, s)).collect();
        state.memberships = snapshot
            .subscriber_segments
            .into_iter()
            .map(|m| ((m.subscriber_id, m.segment_id), m))
            .collect();
        state.wp_users = snapshot.wp_users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        let state = self.state.lock().await;
        DirectorySnapshot {
            newsletters: state.newsletters.values().cloned().collect(),
            subscribers: state.subscribers.values().cloned().collect(),
            segments: state.segments.values().cloned().collect(),
            subscriber_segments: state.memberships.values().cloned().collect(),
            wp_users: state.wp_users.values().cloned().collect(),
        }
    }

    // ========================================
    // seeding（テスト・CLI 用）
    // ========================================

    pub async fn put_subscriber(&self, subscriber: Subscriber) {
        self.state.lock().await.subscribers.insert(subscriber.id, subscriber);
    }

    pub async fn put_segment(&self, segment: Segment) {
        self.state.lock().await.segments.insert(segment.id, segment);
    }

    /// Insert or replace a membership row.
    pub async fn put_membership(&self, membership: SubscriberSegment) {
        let key = (membership.subscriber_id, membership.segment_id);
        self.state.lock().await.memberships.insert(key, membership);
    }

    pub async fn put_wp_user(&self, user: WpUser) {
        self.state.lock().await.wp_users.insert(user.id, user);
    }

    pub async fn newsletters(&self) -> Vec<Newsletter> {
        self.state.lock().await.newsletters.values().cloned().collect()
    }
}

#[async_trait]
impl NewsletterStore for InMemoryDirectory {
    async fn find(&self, id: NewsletterId) -> Result<Option<Newsletter>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.newsletters.get(&id).cloned())
    }

    async fn insert(&self, mut newsletter: Newsletter) -> Result<Newsletter, StoreError> {
        let mut state = self.state.lock().await;
        newsletter.id = state.allocate_newsletter_id();
        state.newsletters.insert(newsletter.id, newsletter.clone());
        Ok(newsletter)
    }

    async fn save(&self, newsletter: &Newsletter) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let Some(slot) = state.newsletters.get_mut(&newsletter.id) else {
            return Err(StoreError::NotFound(newsletter.id.to_string()));
        };
        *slot = newsletter.clone();
        Ok(())
    }

    async fn delete(&self, id: NewsletterId) -> Result<(), StoreError> {
        self.state.lock().await.newsletters.remove(&id);
        Ok(())
    }

    async fn find_by_filter(
        &self,
        newsletter_type: NewsletterType,
        parent_id: Option<NewsletterId>,
    ) -> Result<Vec<Newsletter>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .newsletters
            .values()
            .filter(|n| n.newsletter_type == newsletter_type)
            .filter(|n| parent_id.is_none_or(|p| n.parent_id == Some(p)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubscriberStore for InMemoryDirectory {
    async fn find_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.subscribers.get(&id).cloned())
    }

    async fn find_membership(
        &self,
        subscriber_id: SubscriberId,
        segment_id: SegmentId,
    ) -> Result<Option<SubscriberSegment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.memberships.get(&(subscriber_id, segment_id)).cloned())
    }
}

#[async_trait]
impl SubscribersFinder for InMemoryDirectory {
    async fn find_subscribers_in_segments(
        &self,
        segment_ids: &[SegmentId],
    ) -> Result<Vec<SubscriberId>, StoreError> {
        let state = self.state.lock().await;
        let ids: BTreeSet<SubscriberId> = state
            .memberships
            .values()
            .filter(|m| segment_ids.contains(&m.segment_id) && m.is_active())
            .filter(|m| {
                state
                    .subscribers
                    .get(&m.subscriber_id)
                    .is_some_and(|s| s.is_confirmed() && !s.is_deleted())
            })
            .map(|m| m.subscriber_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl WpUsers for InMemoryDirectory {
    async fn get_user_by_id(&self, id: WpUserId) -> Result<Option<WpUser>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.wp_users.get(&id).cloned())
    }
}
