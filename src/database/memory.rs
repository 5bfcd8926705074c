use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RightsStore, StoreError};
use crate::types::{MatchCondition, RightsPatch, RightsRecord};

/// Process-local rights store for development and tests.
///
/// Each mutation holds the write lock for its whole read-modify-write, which
/// gives the same atomicity as the single SQL statement of the Postgres store.
#[derive(Clone, Default)]
pub struct MemoryRightsStore {
    rows: Arc<RwLock<HashMap<String, RightsRecord>>>,
}

impl MemoryRightsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed rows, replacing any with the same id
    pub async fn insert(&self, record: RightsRecord) {
        self.rows.write().await.insert(record.id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl RightsStore for MemoryRightsStore {
    async fn fetch(&self, id: &str) -> Result<Option<RightsRecord>, StoreError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn upsert(&self, patch: &RightsPatch) -> Result<RightsRecord, StoreError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .entry(patch.id.clone())
            .or_insert_with(|| RightsRecord::new(patch.id.clone()));
        row.merge(patch);
        Ok(row.clone())
    }

    async fn update_where(
        &self,
        patch: &RightsPatch,
        conditions: &[MatchCondition],
    ) -> Result<RightsRecord, StoreError> {
        if patch.fields.is_empty() {
            return Err(StoreError::Query("update without fields".to_string()));
        }

        let mut rows = self.rows.write().await;
        match rows.get_mut(&patch.id) {
            Some(row) if conditions.iter().all(|c| c.matches(row)) => {
                row.merge(patch);
                Ok(row.clone())
            }
            _ => Err(StoreError::NotFound(patch.id.clone())),
        }
    }

    async fn verified_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.is_verified)
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RightsField;

    #[tokio::test]
    async fn upsert_creates_then_merges() {
        let store = MemoryRightsStore::new();

        let created = store
            .upsert(&RightsPatch::new("0x01").with(RightsField::IsVerified, Some(true)))
            .await
            .unwrap();
        assert!(created.is_verified);
        assert!(!created.is_pride);

        let merged = store
            .upsert(&RightsPatch::new("0x01").with(RightsField::IsPride, Some(true)))
            .await
            .unwrap();
        assert!(merged.is_verified);
        assert!(merged.is_pride);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn upsert_merges_ids_differing_only_in_case() {
        let store = MemoryRightsStore::new();
        store
            .upsert(&RightsPatch::new("0x0A").with(RightsField::IsPride, Some(true)))
            .await
            .unwrap();
        let merged = store
            .upsert(&RightsPatch::new("0x0a").with(RightsField::IsVerified, Some(true)))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(merged.id, "0x0a");
        assert!(merged.is_pride && merged.is_verified);
    }

    #[tokio::test]
    async fn conditional_update_never_creates() {
        let store = MemoryRightsStore::new();
        let patch = RightsPatch::new("0x02").with(RightsField::StaffMode, Some(true));
        let staff_only = [MatchCondition::eq(RightsField::IsStaff, true)];

        let err = store.update_where(&patch, &staff_only).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "0x02"));
        assert!(store.is_empty().await);

        store.insert(RightsRecord::new("0x02")).await;
        assert!(store.update_where(&patch, &staff_only).await.is_err());

        let mut staff = RightsRecord::new("0x02");
        staff.is_staff = true;
        store.insert(staff).await;
        let updated = store.update_where(&patch, &staff_only).await.unwrap();
        assert!(updated.staff_mode);
    }

    #[tokio::test]
    async fn lists_verified_ids_sorted() {
        let store = MemoryRightsStore::new();
        for id in ["0x03", "0x01", "0x02"] {
            let mut record = RightsRecord::new(id);
            record.is_verified = id != "0x02";
            store.insert(record).await;
        }
        assert_eq!(store.verified_ids().await.unwrap(), vec!["0x01", "0x03"]);
    }
}
