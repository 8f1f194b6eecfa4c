//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: tasks と受信者リストの正本
//! - **InMemoryDirectory**: newsletters / subscribers / segments / WP users
//! - **CronSchedule**: `cron` クレートによる CronEvaluator
//! - **WooCommerceInactive**: WooCommerce がない環境用

pub mod cron_expr;
pub mod directory;
pub mod memory;
pub mod woocommerce;

// 主要な型を再エクスポート
pub use self::cron_expr::CronSchedule;
pub use self::directory::{DirectorySnapshot, InMemoryDirectory};
pub use self::memory::{InMemoryTaskStore, TaskStoreSnapshot};
pub use self::woocommerce::WooCommerceInactive;
