//! mailcron-core
//!
//! Core building blocks for the cron-driven newsletter sending scheduler.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, meta, task, newsletter, subscriber）
//! - **ports**: 抽象化レイヤー（TaskStore, NewsletterStore, SubscribersFinder, Clock, など）
//! - **impls**: 実装（InMemoryTaskStore, InMemoryDirectory, CronSchedule）
//! - **scheduler**: 1 回の cron パスで期限の来た sending queue を処理する Scheduler
//! - **workers**: SimpleWorker の実行基盤と WooCommerce 同期ワーカー
//! - **budget**: 実行時間の予算
//! - **error**: エラー型

pub mod budget;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod scheduler;
pub mod workers;

pub use error::{ConfigError, SchedulerError, StoreError, SyncError};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use workers::{SimpleWorker, WooCommerceSync, WorkerConfig, WorkerRunner};
