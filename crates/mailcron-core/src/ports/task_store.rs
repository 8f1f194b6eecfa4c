//! TaskStore port - scheduled tasks と sending queue の受信者リスト
//!
//! 状態の正本（source of truth）です。in-memory 実装は
//! `impls::memory::InMemoryTaskStore` にあります。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    InProgressClaim, ProcessingStatus, ScheduledTask, SubscriberId, TaskId, TaskSubscriber,
    TaskType,
};
use crate::error::StoreError;

/// TaskStore は tasks と task_subscribers を管理
///
/// # 設計原則
/// - 1 件ごとの save。タスクをまたぐトランザクションはない
/// - delete は冪等で、受信者の関連も一緒に削除する
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task and return it with its assigned id.
    async fn insert(&self, task: ScheduledTask) -> Result<ScheduledTask, StoreError>;

    /// Overwrite an existing task. `NotFound` if it was deleted meanwhile.
    async fn save(&self, task: &ScheduledTask) -> Result<(), StoreError>;

    async fn find(&self, id: TaskId) -> Result<Option<ScheduledTask>, StoreError>;

    async fn delete(&self, id: TaskId) -> Result<(), StoreError>;

    /// `Scheduled` tasks with `scheduled_at <= now`, optionally of one type.
    async fn find_due(
        &self,
        task_type: Option<TaskType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTask>, StoreError>;

    /// `Ready` tasks of a type.
    async fn find_ready(&self, task_type: TaskType) -> Result<Vec<ScheduledTask>, StoreError>;

    /// `Scheduled` tasks due after `now`, earliest first.
    async fn find_future_scheduled(
        &self,
        task_type: TaskType,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTask>, StoreError>;

    /// Check and take the in-progress flag in one step.
    ///
    /// 読み取りと書き込みの間に他の実行が割り込めないこと。`None` はタスクが
    /// 存在しない場合。
    async fn claim_in_progress(
        &self,
        id: TaskId,
        now: DateTime<Utc>,
        run_timeout: Duration,
        reclaim_at: DateTime<Utc>,
    ) -> Result<Option<InProgressClaim>, StoreError>;

    /// Clear the in-progress flag of a failed run.
    async fn release_in_progress(&self, id: TaskId, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Set `updated_at = now` on every listed task that still exists.
    async fn touch(&self, ids: &[TaskId], now: DateTime<Utc>) -> Result<(), StoreError>;

    async fn get_subscribers(
        &self,
        id: TaskId,
        status: Option<ProcessingStatus>,
    ) -> Result<Vec<TaskSubscriber>, StoreError>;

    /// Replace the recipient list. Duplicates are dropped, first occurrence wins.
    async fn set_subscribers(
        &self,
        id: TaskId,
        subscriber_ids: &[SubscriberId],
    ) -> Result<(), StoreError>;

    async fn update_processed_subscribers(
        &self,
        id: TaskId,
        subscriber_ids: &[SubscriberId],
    ) -> Result<(), StoreError>;
}
