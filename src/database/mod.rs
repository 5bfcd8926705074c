pub mod manager;
pub mod memory;
pub mod rights;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{MatchCondition, RightsPatch, RightsRecord};

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryRightsStore;
pub use rights::PgRightsStore;

/// Errors from a rights store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No rights record matched profile {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence for `rights` rows.
///
/// Every mutating call is one atomic operation against the backend; callers
/// never read-then-write.
#[async_trait]
pub trait RightsStore: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<RightsRecord>, StoreError>;

    /// Create the row if missing, then set exactly the fields present in `patch`.
    async fn upsert(&self, patch: &RightsPatch) -> Result<RightsRecord, StoreError>;

    /// Set the fields in `patch` on the row with `patch.id`, only if every
    /// condition holds. No row matched is `StoreError::NotFound`.
    async fn update_where(
        &self,
        patch: &RightsPatch,
        conditions: &[MatchCondition],
    ) -> Result<RightsRecord, StoreError>;

    /// Ids of every profile with `is_verified = true`
    async fn verified_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
