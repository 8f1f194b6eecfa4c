//! NewsletterStore port.

use async_trait::async_trait;

use crate::domain::{Newsletter, NewsletterId, NewsletterType};
use crate::error::StoreError;

#[async_trait]
pub trait NewsletterStore: Send + Sync {
    /// Soft-deleted newsletters are returned too; callers check `deleted_at`.
    async fn find(&self, id: NewsletterId) -> Result<Option<Newsletter>, StoreError>;

    async fn insert(&self, newsletter: Newsletter) -> Result<Newsletter, StoreError>;

    async fn save(&self, newsletter: &Newsletter) -> Result<(), StoreError>;

    async fn delete(&self, id: NewsletterId) -> Result<(), StoreError>;

    async fn find_by_filter(
        &self,
        newsletter_type: NewsletterType,
        parent_id: Option<NewsletterId>,
    ) -> Result<Vec<Newsletter>, StoreError>;
}
