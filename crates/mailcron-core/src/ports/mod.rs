//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（WordPress のデータベース、WooCommerce など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod cron;
pub mod newsletter_store;
pub mod subscriber_store;
pub mod task_store;
pub mod woocommerce;

use std::sync::Arc;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::cron::CronEvaluator;
pub use self::newsletter_store::NewsletterStore;
pub use self::subscriber_store::{SubscriberStore, SubscribersFinder, WpUsers};
pub use self::task_store::TaskStore;
pub use self::woocommerce::{CustomerSynchronizer, WooCommerceHelper};

/// Collaborators of the sending scheduler.
#[derive(Clone)]
pub struct Ports {
    pub clock: Arc<dyn Clock>,
    pub cron: Arc<dyn CronEvaluator>,
    pub tasks: Arc<dyn TaskStore>,
    pub newsletters: Arc<dyn NewsletterStore>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub finder: Arc<dyn SubscribersFinder>,
    pub wp_users: Arc<dyn WpUsers>,
}
