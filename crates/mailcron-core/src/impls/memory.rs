//! InMemoryTaskStore - 開発用・テスト用の TaskStore
//!
//! アリーナ方式: `TaskId` をキーにした BTreeMap がレコードの正本です。
//! CLI は [`TaskStoreSnapshot`] を JSON ファイルに保存して、cron の
//! 起動をまたいで状態を引き継ぎます。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{
    InProgressClaim, ProcessingStatus, ScheduledTask, SubscriberId, TaskId, TaskStatus,
    TaskSubscriber, TaskType,
};
use crate::error::StoreError;
use crate::ports::TaskStore;

/// Serializable image of an [`InMemoryTaskStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskStoreSnapshot {
    pub tasks: Vec<ScheduledTask>,
    pub task_subscribers: Vec<TaskSubscriber>,
}

struct InMemoryTaskState {
    tasks: BTreeMap<TaskId, ScheduledTask>,

    /// Recipient rows per sending queue, in insertion order.
    subscribers: BTreeMap<TaskId, Vec<TaskSubscriber>>,

    /// Next task ID to assign.
    next_task_id: u64,
}

impl InMemoryTaskState {
    fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            subscribers: BTreeMap::new(),
            next_task_id: 1,
        }
    }

    fn allocate_task_id(&mut self) -> TaskId {
        let id = TaskId::new(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    fn filtered<'a>(
        &'a self,
        mut pred: impl FnMut(&ScheduledTask) -> bool + 'a,
    ) -> impl Iterator<Item = ScheduledTask> + 'a {
        self.tasks.values().filter(move |t| pred(t)).cloned()
    }
}

#[derive(Clone)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryTaskState>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryTaskState::new())),
        }
    }

    /// Rebuild a store from a snapshot. Ids keep their values; the id
    /// counter continues after the largest one.
    pub fn from_snapshot(snapshot: TaskStoreSnapshot) -> Self {
        let mut state = InMemoryTaskState::new();
        for task in snapshot.tasks {
            state.next_task_id = state.next_task_id.max(task.id.value() + 1);
            state.tasks.insert(task.id, task);
        }
        for row in snapshot.task_subscribers {
            if state.tasks.contains_key(&row.task_id) {
                state.subscribers.entry(row.task_id).or_default().push(row);
            }
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn snapshot(&self) -> TaskStoreSnapshot {
        let state = self.state.lock().await;
        TaskStoreSnapshot {
            tasks: state.tasks.values().cloned().collect(),
            task_subscribers: state.subscribers.values().flatten().cloned().collect(),
        }
    }

    /// All tasks, in id order.
    pub async fn all(&self) -> Vec<ScheduledTask> {
        let state = self.state.lock().await;
        state.tasks.values().cloned().collect()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, mut task: ScheduledTask) -> Result<ScheduledTask, StoreError> {
        let mut state = self.state.lock().await;
        task.id = state.allocate_task_id();
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn save(&self, task: &ScheduledTask) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let Some(slot) = state.tasks.get_mut(&task.id) else {
            return Err(StoreError::NotFound(task.id.to_string()));
        };
        *slot = task.clone();
        Ok(())
    }

    async fn find(&self, id: TaskId) -> Result<Option<ScheduledTask>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.tasks.remove(&id);
        state.subscribers.remove(&id);
        Ok(())
    }

    async fn find_due(
        &self,
        task_type: Option<TaskType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTask>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .filtered(move |t| task_type.is_none_or(|ty| t.task_type == ty) && t.is_due(now))
            .collect())
    }

    async fn find_ready(&self, task_type: TaskType) -> Result<Vec<ScheduledTask>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .filtered(move |t| t.task_type == task_type && t.status == TaskStatus::Ready)
            .collect())
    }

    async fn find_future_scheduled(
        &self,
        task_type: TaskType,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledTask>, StoreError> {
        let state = self.state.lock().await;
        let mut tasks: Vec<ScheduledTask> = state
            .filtered(move |t| {
                t.task_type == task_type
                    && t.status == TaskStatus::Scheduled
                    && t.scheduled_at.is_some_and(|at| at > now)
            })
            .collect();
        tasks.sort_by_key(|t| t.scheduled_at);
        Ok(tasks)
    }

    async fn claim_in_progress(
        &self,
        id: TaskId,
        now: DateTime<Utc>,
        run_timeout: Duration,
        reclaim_at: DateTime<Utc>,
    ) -> Result<Option<InProgressClaim>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state
            .tasks
            .get_mut(&id)
            .map(|task| task.claim_in_progress(now, run_timeout, reclaim_at)))
    }

    async fn release_in_progress(&self, id: TaskId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let Some(task) = state.tasks.get_mut(&id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        task.meta.clear_in_progress();
        task.updated_at = now;
        Ok(())
    }

    async fn touch(&self, ids: &[TaskId], now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        for id in ids {
            if let Some(task) = state.tasks.get_mut(id) {
                task.updated_at = now;
            }
        }
        Ok(())
    }

    async fn get_subscribers(
        &self,
        id: TaskId,
        status: Option<ProcessingStatus>,
    ) -> Result<Vec<TaskSubscriber>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .subscribers
            .get(&id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| status.is_none_or(|s| row.status == s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_subscribers(
        &self,
        id: TaskId,
        subscriber_ids: &[SubscriberId],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !state.tasks.contains_key(&id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let mut seen = HashSet::new();
        let rows = subscriber_ids
            .iter()
            .filter(|sid| seen.insert(**sid))
            .map(|sid| TaskSubscriber::unprocessed(id, *sid))
            .collect();
        state.subscribers.insert(id, rows);
        Ok(())
    }

    async fn update_processed_subscribers(
        &self,
        id: TaskId,
        subscriber_ids: &[SubscriberId],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let Some(rows) = state.subscribers.get_mut(&id) else {
            return Ok(());
        };
        for row in rows.iter_mut() {
            if subscriber_ids.contains(&row.subscriber_id) {
                row.status = ProcessingStatus::Processed;
            }
        }
        Ok(())
    }
}
