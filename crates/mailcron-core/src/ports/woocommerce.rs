//! WooCommerce collaborators used by the sync worker.

use async_trait::async_trait;

use crate::error::SyncError;

pub trait WooCommerceHelper: Send + Sync {
    fn is_woocommerce_active(&self) -> bool;
}

/// Performs the actual customer import.
#[async_trait]
pub trait CustomerSynchronizer: Send + Sync {
    async fn synchronize_customers(&self) -> Result<(), SyncError>;
}
