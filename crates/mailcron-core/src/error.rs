use thiserror::Error;

use crate::domain::NewsletterId;

/// Store-level failure reported by a port implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// A configuration value outside the supported range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be at most {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Failure reported by a worker's external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("woocommerce is unavailable: {0}")]
    Unavailable(String),

    #[error("customer import failed: {0}")]
    Import(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The wall-clock budget of one pass is spent. Fatal for the pass.
    #[error("Maximum execution time has been reached.")]
    ExecutionLimitReached,

    #[error("newsletter not found: {0}")]
    NewsletterNotFound(NewsletterId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker task failed")]
    Sync(#[source] SyncError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_limit_message_is_exact() {
        assert_eq!(
            SchedulerError::ExecutionLimitReached.to_string(),
            "Maximum execution time has been reached."
        );
    }

    #[test]
    fn store_errors_convert() {
        let err: SchedulerError = StoreError::NotFound("task-3".to_string()).into();
        assert!(matches!(err, SchedulerError::Store(StoreError::NotFound(_))));
        assert_eq!(err.to_string(), "record not found: task-3");
    }

    #[test]
    fn sync_error_is_kept_as_source() {
        use std::error::Error as _;

        let err = SchedulerError::Sync(SyncError::Import("timeout".to_string()));
        assert_eq!(err.to_string(), "worker task failed");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("customer import failed: timeout"));
    }
}
