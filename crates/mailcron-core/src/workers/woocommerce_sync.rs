use std::sync::Arc;

use async_trait::async_trait;

use super::{InProgressGuard, SimpleWorker, WorkerConfig};
use crate::domain::{ScheduledTask, TaskType};
use crate::error::SchedulerError;
use crate::ports::{Clock, CustomerSynchronizer, TaskStore, WooCommerceHelper};

/// Imports WooCommerce customers into the WooCommerce segment.
///
/// A sync can run for a long time, so every run holds the task's
/// in-progress flag.
pub struct WooCommerceSync {
    helper: Arc<dyn WooCommerceHelper>,
    synchronizer: Arc<dyn CustomerSynchronizer>,
    guard: InProgressGuard,
}

impl WooCommerceSync {
    pub fn new(
        helper: Arc<dyn WooCommerceHelper>,
        synchronizer: Arc<dyn CustomerSynchronizer>,
        tasks: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        config: &WorkerConfig,
    ) -> Self {
        let guard = InProgressGuard::new(
            tasks,
            clock,
            config.task_run_timeout(),
            config.timed_out_reschedule(),
        );
        Self {
            helper,
            synchronizer,
            guard,
        }
    }
}

#[async_trait]
impl SimpleWorker for WooCommerceSync {
    fn task_type(&self) -> TaskType {
        TaskType::WoocommerceSync
    }

    fn check_processing_requirements(&self) -> bool {
        self.helper.is_woocommerce_active()
    }

    async fn process_task_strategy(&self, task: &ScheduledTask) -> Result<bool, SchedulerError> {
        self.guard
            .run(task, || self.synchronizer.synchronize_customers())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use crate::error::SyncError;
    use crate::impls::InMemoryTaskStore;
    use crate::ports::FixedClock;
    use crate::workers::WorkerRunner;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Helper(bool);

    impl WooCommerceHelper for Helper {
        fn is_woocommerce_active(&self) -> bool {
            self.0
        }
    }

    #[derive(Default)]
    struct Synchronizer {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl CustomerSynchronizer for Synchronizer {
        async fn synchronize_customers(&self) -> Result<(), SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(SyncError::Import("test error".to_string()));
            }
            Ok(())
        }
    }

    struct Fixture {
        store: InMemoryTaskStore,
        clock: Arc<FixedClock>,
        synchronizer: Arc<Synchronizer>,
        worker: WooCommerceSync,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn fixture(active: bool) -> Fixture {
        let store = InMemoryTaskStore::new();
        let clock = Arc::new(FixedClock::new(start()));
        let synchronizer = Arc::new(Synchronizer::default());
        let worker = WooCommerceSync::new(
            Arc::new(Helper(active)),
            synchronizer.clone(),
            Arc::new(store.clone()),
            clock.clone(),
            &WorkerConfig::default(),
        );
        Fixture {
            store,
            clock,
            synchronizer,
            worker,
        }
    }

    impl Fixture {
        async fn ready_task(&self) -> ScheduledTask {
            self.store
                .insert(
                    ScheduledTask::new(TaskType::WoocommerceSync, start())
                        .with_scheduled_at(start())
                        .with_status(TaskStatus::Ready),
                )
                .await
                .unwrap()
        }

        async fn reload(&self, task: &ScheduledTask) -> ScheduledTask {
            self.store.find(task.id).await.unwrap().unwrap()
        }

        fn calls(&self) -> usize {
            self.synchronizer.calls.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn requirements_follow_woocommerce_state() {
        assert!(fixture(true).worker.check_processing_requirements());
        assert!(!fixture(false).worker.check_processing_requirements());
    }

    #[tokio::test]
    async fn strategy_runs_the_sync() {
        let fx = fixture(true);
        let task = fx.ready_task().await;

        assert!(fx.worker.process_task_strategy(&task).await.unwrap());
        assert_eq!(fx.calls(), 1);
        assert_eq!(fx.reload(&task).await.meta.in_progress_since(), Some(start()));
    }

    #[tokio::test]
    async fn second_immediate_run_is_refused_without_side_effects() {
        let fx = fixture(true);
        let task = fx.ready_task().await;

        assert!(fx.worker.process_task_strategy(&task).await.unwrap());
        let after_first = fx.reload(&task).await;

        fx.clock.advance(Duration::seconds(1));
        assert!(!fx.worker.process_task_strategy(&task).await.unwrap());

        assert_eq!(fx.calls(), 1);
        assert_eq!(fx.reload(&task).await, after_first);
        assert!(!after_first.meta.is_empty());
    }

    #[tokio::test]
    async fn failed_sync_clears_the_flag_and_propagates() {
        let fx = fixture(true);
        fx.synchronizer.fail.store(true, Ordering::SeqCst);
        let task = fx.ready_task().await;

        let err = fx.worker.process_task_strategy(&task).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Sync(SyncError::Import(ref msg)) if msg == "test error"
        ));
        assert!(fx.reload(&task).await.meta.is_empty());

        // The task is not wedged: the next run goes through.
        fx.synchronizer.fail.store(false, Ordering::SeqCst);
        assert!(fx.worker.process_task_strategy(&task).await.unwrap());
        assert_eq!(fx.calls(), 2);
    }

    #[tokio::test]
    async fn stale_run_is_reclaimed_and_rescheduled() {
        let fx = fixture(true);
        let task = fx.ready_task().await;
        assert!(fx.worker.process_task_strategy(&task).await.unwrap());
        let scheduled_at = fx.reload(&task).await.scheduled_at;

        fx.clock.advance(Duration::minutes(121));
        assert!(!fx.worker.process_task_strategy(&task).await.unwrap());

        let stored = fx.reload(&task).await;
        assert_eq!(stored.status, TaskStatus::Scheduled);
        assert!(stored.meta.is_empty());
        assert!(stored.scheduled_at > scheduled_at);
        assert_eq!(stored.scheduled_at, Some(fx.clock.now() + Duration::minutes(5)));
        assert_eq!(fx.calls(), 1);
    }

    #[tokio::test]
    async fn flag_within_timeout_still_blocks() {
        let fx = fixture(true);
        let task = fx.ready_task().await;
        assert!(fx.worker.process_task_strategy(&task).await.unwrap());

        fx.clock.advance(Duration::minutes(120));
        assert!(!fx.worker.process_task_strategy(&task).await.unwrap());
        assert_eq!(fx.reload(&task).await.status, TaskStatus::Ready);
    }

    #[tokio::test]
    async fn overlapping_strategy_calls_sync_once() {
        let fx = fixture(true);
        let task = fx.ready_task().await;

        let (a, b) = tokio::join!(
            fx.worker.process_task_strategy(&task),
            fx.worker.process_task_strategy(&task),
        );
        assert!(a.unwrap() ^ b.unwrap());
        assert_eq!(fx.calls(), 1);
    }

    #[tokio::test]
    async fn runner_completes_the_task_and_clears_the_flag() {
        let fx = fixture(true);
        let task = fx.ready_task().await;
        let runner = WorkerRunner::new(
            fx.worker,
            Arc::new(fx.store.clone()),
            fx.clock.clone(),
            &WorkerConfig::default(),
        );

        assert!(runner.process().await.unwrap());
        let stored = fx.store.find(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert!(stored.meta.is_empty());
        assert_eq!(fx.synchronizer.calls.load(Ordering::SeqCst), 1);
    }
}
