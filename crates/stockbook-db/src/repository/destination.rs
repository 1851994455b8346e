//! # Destination Repository
//!
//! Where outgoing stock goes. A destination referenced by ledger rows cannot
//! be deleted, since the ledger is never rewritten.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::pool::WriteGate;
use stockbook_core::validation::validate_new_destination;
use stockbook_core::{CoreError, Destination, NewDestination, TenantId};

const SELECT_DESTINATION: &str = r#"
    SELECT id, tenant_id, name, description, created_at
    FROM destinations
"#;

#[derive(Debug, Clone)]
pub struct DestinationRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl DestinationRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        DestinationRepository { pool, gate }
    }

    pub async fn create(&self, tenant: &TenantId, new: &NewDestination) -> DbResult<Destination> {
        validate_new_destination(new)?;

        let destination = Destination {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.as_str().to_string(),
            name: new.name.trim().to_string(),
            description: new
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            created_at: Utc::now(),
        };

        let _guard = self.gate.acquire().await;
        sqlx::query(
            r#"
            INSERT INTO destinations (id, tenant_id, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&destination.id)
        .bind(&destination.tenant_id)
        .bind(&destination.name)
        .bind(&destination.description)
        .bind(destination.created_at)
        .execute(&self.pool)
        .await?;

        info!(tenant_id = %tenant, destination_id = %destination.id, "Destination created");
        Ok(destination)
    }

    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Destination>> {
        let sql = format!("{SELECT_DESTINATION} WHERE id = ?1 AND tenant_id = ?2");
        let destination = sqlx::query_as::<_, Destination>(&sql)
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(destination)
    }

    pub async fn list(&self, tenant: &TenantId) -> DbResult<Vec<Destination>> {
        let sql = format!("{SELECT_DESTINATION} WHERE tenant_id = ?1 ORDER BY name COLLATE NOCASE");
        let destinations = sqlx::query_as::<_, Destination>(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(destinations)
    }

    /// Deletes a destination no stock movement refers to.
    pub async fn delete(&self, tenant: &TenantId, id: &str) -> DbResult<()> {
        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        let movement_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE tenant_id = ?1 AND destination_id = ?2",
        )
        .bind(tenant.as_str())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if movement_count > 0 {
            warn!(tenant_id = %tenant, destination_id = %id, movement_count, "Refusing to delete destination");
            return Err(CoreError::DestinationInUse {
                destination_id: id.to_string(),
                movement_count,
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM destinations WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::DestinationNotFound(id.to_string()).into());
        }

        tx.commit().await?;
        info!(tenant_id = %tenant, destination_id = %id, "Destination deleted");
        Ok(())
    }
}

/// Fails with `DestinationNotFound` unless the destination exists for the tenant.
pub(crate) async fn ensure_exists(conn: &mut SqliteConnection, tenant: &TenantId, id: &str) -> DbResult<()> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM destinations WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&mut *conn)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(CoreError::DestinationNotFound(id.to_string()).into()),
    }
}
