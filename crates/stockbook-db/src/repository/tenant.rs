//! # Tenant Repository
//!
//! Maps an authenticated owner email to the tenant that owns every other row.
//!
//! ```text
//! identity provider ──► owner email ──► resolve_or_create() ──► TenantId
//!                                        (once per request)      │
//!                                                                ▼
//!                                              every repository / service call
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::WriteGate;
use stockbook_core::validation::{normalize_email, validate_email};
use stockbook_core::Tenant;

/// Repository for tenants.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        TenantRepository { pool, gate }
    }

    /// Finds the tenant owned by `owner_email`, creating it on first sight.
    ///
    /// The email is trimmed and lower-cased first, so `Owner@Shop.com` and
    /// `owner@shop.com` resolve to the same tenant.
    ///
    /// ## Returns
    /// * `Ok(Tenant)` - Existing or newly created tenant
    /// * `Err(DbError::Rejected)` - Email is not valid
    pub async fn resolve_or_create(&self, owner_email: &str) -> DbResult<Tenant> {
        validate_email(owner_email)?;
        let email = normalize_email(owner_email);

        if let Some(tenant) = self.get_by_email(&email).await? {
            return Ok(tenant);
        }

        let _guard = self.gate.acquire().await;

        let id = Uuid::new_v4().to_string();
        let name = email.split('@').next().unwrap_or(&email).to_string();

        // Another request may have created it while we waited for the gate
        let inserted = sqlx::query(
            r#"
            INSERT INTO tenants (id, owner_email, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(owner_email) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(&name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            info!(tenant_id = %id, "Tenant created");
        }

        self.get_by_email(&email)
            .await?
            .ok_or_else(|| DbError::not_found("Tenant", email))
    }

    /// Looks up a tenant by (already normalised) owner email.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<Tenant>> {
        debug!(email = %email, "Looking up tenant");

        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, owner_email, name, created_at FROM tenants WHERE owner_email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, owner_email, name, created_at FROM tenants WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Renames the business shown on invoices.
    pub async fn rename(&self, id: &str, name: &str) -> DbResult<Tenant> {
        stockbook_core::validation::validate_name("name", name)?;
        let _guard = self.gate.acquire().await;

        let result = sqlx::query("UPDATE tenants SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(name.trim())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tenant", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Tenant", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
