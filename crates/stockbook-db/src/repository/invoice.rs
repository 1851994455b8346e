//! # Invoice Repository
//!
//! Read access to invoices. Creation, status changes and deletion go through
//! [`InvoiceService`](crate::service::invoicing::InvoiceService) because they
//! must stay consistent with the ledger.

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockbook_core::invoice::InvoiceDocumentLine;
use stockbook_core::{CoreError, Invoice, InvoiceStatus, Money, TenantId};

pub(crate) const SELECT_INVOICE: &str = r#"
    SELECT id, tenant_id, invoice_number, client_id, subtotal_cents, tax_rate_bps,
           tax_enabled, tax_cents, total_cents, status, created_at, updated_at
    FROM invoices
"#;

/// Optional filters for [`InvoiceRepository::list`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<String>,
}

impl InvoiceFilter {
    pub fn status(status: InvoiceStatus) -> Self {
        InvoiceFilter {
            status: Some(status),
            client_id: None,
        }
    }

    pub fn client(client_id: impl Into<String>) -> Self {
        InvoiceFilter {
            status: None,
            client_id: Some(client_id.into()),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentLineRow {
    product_name: String,
    unit: String,
    quantity: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("{SELECT_INVOICE} WHERE id = ?1 AND tenant_id = ?2");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    /// Gets an invoice or fails with `InvoiceNotFound`.
    pub async fn require(&self, tenant: &TenantId, id: &str) -> DbResult<Invoice> {
        self.get(tenant, id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()).into())
    }

    pub async fn get_by_number(&self, tenant: &TenantId, number: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("{SELECT_INVOICE} WHERE tenant_id = ?1 AND invoice_number = ?2");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(tenant.as_str())
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    /// Lists invoices, newest first.
    pub async fn list(&self, tenant: &TenantId, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        debug!(tenant_id = %tenant, ?filter, "Listing invoices");

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_INVOICE);
        query.push(" WHERE tenant_id = ").push_bind(tenant.as_str());

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(client_id) = &filter.client_id {
            query.push(" AND client_id = ").push_bind(client_id.as_str());
        }
        query.push(" ORDER BY created_at DESC, invoice_number DESC");

        let invoices = query
            .build_query_as::<Invoice>()
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    pub async fn count(&self, tenant: &TenantId) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE tenant_id = ?1")
            .bind(tenant.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Printable lines: the invoice's ledger rows with product name and unit.
    pub async fn document_lines(&self, tenant: &TenantId, invoice_id: &str) -> DbResult<Vec<InvoiceDocumentLine>> {
        let rows = sqlx::query_as::<_, DocumentLineRow>(
            r#"
            SELECT p.name AS product_name, p.unit, t.quantity, t.unit_price_cents, t.subtotal_cents
            FROM transactions t
            JOIN products p ON p.id = t.product_id
            WHERE t.tenant_id = ?1 AND t.invoice_id = ?2
            ORDER BY t.created_at, t.rowid
            "#,
        )
        .bind(tenant.as_str())
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvoiceDocumentLine {
                product_name: row.product_name,
                unit: row.unit,
                quantity: row.quantity,
                unit_price: Money::from_cents(row.unit_price_cents),
                subtotal: Money::from_cents(row.subtotal_cents),
            })
            .collect())
    }
}
