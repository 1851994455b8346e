//! # Client Repository
//!
//! Clients are billed on invoices. A client that owns invoices cannot be
//! deleted, so printed invoices always resolve to a billing address.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::pool::WriteGate;
use stockbook_core::validation::validate_new_client;
use stockbook_core::{Client, CoreError, NewClient, TenantId};

pub(crate) const SELECT_CLIENT: &str = r#"
    SELECT id, tenant_id, name, email, phone, address, created_at
    FROM clients
"#;

/// Repository for clients.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        ClientRepository { pool, gate }
    }

    pub async fn create(&self, tenant: &TenantId, new: &NewClient) -> DbResult<Client> {
        validate_new_client(new)?;

        let client = Client {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.as_str().to_string(),
            name: new.name.trim().to_string(),
            email: clean_optional(new.email.as_deref()),
            phone: clean_optional(new.phone.as_deref()),
            address: new.address.trim().to_string(),
            created_at: Utc::now(),
        };

        let _guard = self.gate.acquire().await;
        sqlx::query(
            r#"
            INSERT INTO clients (id, tenant_id, name, email, phone, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&client.id)
        .bind(&client.tenant_id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        info!(tenant_id = %tenant, client_id = %client.id, "Client created");
        Ok(client)
    }

    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("{SELECT_CLIENT} WHERE id = ?1 AND tenant_id = ?2");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    /// Gets a client or fails with `ClientNotFound`.
    pub async fn require(&self, tenant: &TenantId, id: &str) -> DbResult<Client> {
        self.get(tenant, id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(id.to_string()).into())
    }

    pub async fn list(&self, tenant: &TenantId) -> DbResult<Vec<Client>> {
        let sql = format!("{SELECT_CLIENT} WHERE tenant_id = ?1 ORDER BY name COLLATE NOCASE");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }

    /// Replaces a client's details.
    pub async fn update(&self, tenant: &TenantId, id: &str, details: &NewClient) -> DbResult<Client> {
        validate_new_client(details)?;

        {
            let _guard = self.gate.acquire().await;
            let result = sqlx::query(
                r#"
                UPDATE clients SET name = ?3, email = ?4, phone = ?5, address = ?6
                WHERE id = ?1 AND tenant_id = ?2
                "#,
            )
            .bind(id)
            .bind(tenant.as_str())
            .bind(details.name.trim())
            .bind(clean_optional(details.email.as_deref()))
            .bind(clean_optional(details.phone.as_deref()))
            .bind(details.address.trim())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CoreError::ClientNotFound(id.to_string()).into());
            }
        }

        info!(tenant_id = %tenant, client_id = %id, "Client updated");
        self.require(tenant, id).await
    }

    /// Deletes a client that owns no invoices.
    ///
    /// ## Returns
    /// * `Err(CoreError::ClientHasInvoices)` - Client is still billed somewhere
    /// * `Err(CoreError::ClientNotFound)` - Unknown client
    pub async fn delete(&self, tenant: &TenantId, id: &str) -> DbResult<()> {
        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        let invoice_count = count_invoices(&mut *tx, tenant, id).await?;
        if invoice_count > 0 {
            warn!(tenant_id = %tenant, client_id = %id, invoice_count, "Refusing to delete client");
            return Err(CoreError::ClientHasInvoices {
                client_id: id.to_string(),
                invoice_count,
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ClientNotFound(id.to_string()).into());
        }

        tx.commit().await?;
        info!(tenant_id = %tenant, client_id = %id, "Client deleted");
        Ok(())
    }
}

/// Fails with `ClientNotFound` unless the client exists for the tenant.
pub(crate) async fn ensure_exists(conn: &mut SqliteConnection, tenant: &TenantId, id: &str) -> DbResult<()> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM clients WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&mut *conn)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(CoreError::ClientNotFound(id.to_string()).into()),
    }
}

async fn count_invoices(conn: &mut SqliteConnection, tenant: &TenantId, client_id: &str) -> DbResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE tenant_id = ?1 AND client_id = ?2")
            .bind(tenant.as_str())
            .bind(client_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client, product, setup};
    use crate::DbError;
    use stockbook_core::{InvoiceLine, NewInvoice};

    #[tokio::test]
    async fn test_create_trims_and_drops_empty_optionals() {
        let (db, tenant) = setup().await;
        let c = db
            .clients()
            .create(
                &tenant,
                &NewClient {
                    name: "  City Clinic ".into(),
                    email: Some("   ".into()),
                    phone: Some("+44 20 7946 0000".into()),
                    address: "1 Main St".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(c.name, "City Clinic");
        assert!(c.email.is_none());
        assert_eq!(c.phone.as_deref(), Some("+44 20 7946 0000"));
    }

    #[tokio::test]
    async fn test_update_and_list() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Beta").await;
        client(&db, &tenant, "alpha").await;

        let updated = db
            .clients()
            .update(
                &tenant,
                &c.id,
                &NewClient {
                    name: "Beta Care".into(),
                    email: Some("billing@beta.example".into()),
                    phone: None,
                    address: "2 Side St".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("billing@beta.example"));

        let names: Vec<_> = db
            .clients()
            .list(&tenant)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["alpha", "Beta Care"]);
    }

    #[tokio::test]
    async fn test_delete_refused_while_client_has_invoices() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 5, 100).await;

        db.invoicing()
            .create_invoice(
                &tenant,
                &NewInvoice {
                    invoice_number: None,
                    client_id: c.id.clone(),
                    lines: vec![InvoiceLine::new(&p.id, 1)],
                    tax_rate_bps: 0,
                    tax_enabled: false,
                    status: Default::default(),
                    destination_id: None,
                },
            )
            .await
            .unwrap();

        let err = db.clients().delete(&tenant, &c.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::ClientHasInvoices { invoice_count: 1, .. })
        ));
        assert!(db.clients().get(&tenant, &c.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_client_without_invoices() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Walk-in").await;

        db.clients().delete(&tenant, &c.id).await.unwrap();
        assert!(db.clients().get(&tenant, &c.id).await.unwrap().is_none());

        let err = db.clients().delete(&tenant, &c.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::ClientNotFound(_))));
    }
}
