use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{RightsStore, StoreError};
use crate::types::{MatchCondition, RightsPatch, RightsRecord};

const TABLE: &str = "rights";

const COLUMNS: &str = "id, is_staff, is_gardener, is_trusted_member, is_verified, is_pride, \
                       high_signal_notification_filter, staff_mode";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS rights (
        id TEXT PRIMARY KEY,
        is_staff BOOLEAN NOT NULL DEFAULT false,
        is_gardener BOOLEAN NOT NULL DEFAULT false,
        is_trusted_member BOOLEAN NOT NULL DEFAULT false,
        is_verified BOOLEAN NOT NULL DEFAULT false,
        is_pride BOOLEAN NOT NULL DEFAULT false,
        high_signal_notification_filter BOOLEAN NOT NULL DEFAULT false,
        staff_mode BOOLEAN NOT NULL DEFAULT false
    )
"#;

/// `INSERT ... ON CONFLICT` touching only the columns present in the patch.
///
/// Bind order: id, then field values in patch order.
fn upsert_sql(patch: &RightsPatch) -> String {
    let columns: Vec<&str> = patch.fields.keys().map(|f| f.column()).collect();

    let mut insert_columns = vec!["id"];
    insert_columns.extend(&columns);
    let placeholders: Vec<String> = (1..=insert_columns.len()).map(|i| format!("${}", i)).collect();

    // With nothing to set the no-op assignment still lets RETURNING yield the existing row
    let assignments = if columns.is_empty() {
        "id = EXCLUDED.id".to_string()
    } else {
        columns
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "INSERT INTO {TABLE} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {} RETURNING {COLUMNS}",
        insert_columns.join(", "),
        placeholders.join(", "),
        assignments,
    )
}

/// Conditional `UPDATE` matching the id and every condition in one statement.
///
/// Bind order: field values, id, condition values.
fn update_sql(patch: &RightsPatch, conditions: &[MatchCondition]) -> String {
    let mut n = 0;
    let mut next = || {
        n += 1;
        format!("${}", n)
    };

    let assignments: Vec<String> = patch
        .fields
        .keys()
        .map(|f| format!("{} = {}", f.column(), next()))
        .collect();

    let mut predicates = vec![format!("id = {}", next())];
    predicates.extend(conditions.iter().map(|c| format!("{} = {}", c.field.column(), next())));

    format!(
        "UPDATE {TABLE} SET {} WHERE {} RETURNING {COLUMNS}",
        assignments.join(", "),
        predicates.join(" AND "),
    )
}

/// Rights store backed by the Postgres `rights` table
#[derive(Clone)]
pub struct PgRightsStore {
    pool: PgPool,
}

impl PgRightsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `rights` table when it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RightsStore for PgRightsStore {
    async fn fetch(&self, id: &str) -> Result<Option<RightsRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} WHERE id = $1");
        let row = sqlx::query_as::<_, RightsRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert(&self, patch: &RightsPatch) -> Result<RightsRecord, StoreError> {
        let sql = upsert_sql(patch);
        debug!("rights upsert: {}", sql);

        let mut query = sqlx::query_as::<_, RightsRecord>(&sql).bind(&patch.id);
        for value in patch.fields.values() {
            query = query.bind(*value);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn update_where(
        &self,
        patch: &RightsPatch,
        conditions: &[MatchCondition],
    ) -> Result<RightsRecord, StoreError> {
        if patch.fields.is_empty() {
            return Err(StoreError::Query("update without fields".to_string()));
        }

        let sql = update_sql(patch, conditions);
        debug!("rights update: {}", sql);

        let mut query = sqlx::query_as::<_, RightsRecord>(&sql);
        for value in patch.fields.values() {
            query = query.bind(*value);
        }
        query = query.bind(&patch.id);
        for condition in conditions {
            query = query.bind(condition.value);
        }

        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(patch.id.clone()))
    }

    async fn verified_ids(&self) -> Result<Vec<String>, StoreError> {
        let sql = format!("SELECT id FROM {TABLE} WHERE is_verified = true ORDER BY id");
        let ids = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
