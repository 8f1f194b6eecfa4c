//! Domain model: typed records for tasks, newsletters and subscribers.
//!
//! ORM の動的プロパティではなく、明示的な型付きレコードとして表現します。
//! 永続化は `ports` の trait 経由で行います。

pub mod ids;
pub mod meta;
pub mod newsletter;
pub mod subscriber;
pub mod task;

pub use ids::{NewsletterId, SegmentId, SubscriberId, TaskId, WpUserId};
pub use meta::{MetaKey, TaskMeta};
pub use newsletter::{
    IntervalType, Newsletter, NewsletterOptions, NewsletterStatus, NewsletterType, SendTo,
    WORDPRESS_ALL_ROLES, WelcomeEvent,
};
pub use subscriber::{
    Segment, SegmentType, Subscriber, SubscriberSegment, SubscriberStatus, WpUser,
};
pub use task::{
    InProgressClaim, ProcessingStatus, ScheduledTask, TaskStatus, TaskSubscriber, TaskType,
};
