//! WooCommerce stand-ins for installs without the plugin.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::ports::{CustomerSynchronizer, WooCommerceHelper};

/// WooCommerce is not installed: the sync worker never runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct WooCommerceInactive;

impl WooCommerceHelper for WooCommerceInactive {
    fn is_woocommerce_active(&self) -> bool {
        false
    }
}

#[async_trait]
impl CustomerSynchronizer for WooCommerceInactive {
    async fn synchronize_customers(&self) -> Result<(), SyncError> {
        tracing::debug!("woocommerce inactive, nothing to synchronize");
        Ok(())
    }
}
