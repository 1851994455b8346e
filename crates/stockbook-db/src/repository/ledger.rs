//! # Ledger Repository
//!
//! The `transactions` table: one immutable row per stock movement.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kind       effect on products.quantity     written by                 │
//! │  ─────────  ───────────────────────────     ─────────────────────────  │
//! │  PURCHASE   + quantity                      replenish, product create  │
//! │  SALE       − quantity                      deduct, create_invoice     │
//! │  RETURN     − quantity                      deduct (kind = RETURN)     │
//! │                                                                         │
//! │  For every product:  quantity = Σ PURCHASE − Σ SALE − Σ RETURN          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never updated or deleted. The write helpers here take a
//! connection so they run inside the caller's database transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::{Money, TenantId, Transaction, TransactionKind, ValidationError};

const SELECT_TRANSACTION: &str = r#"
    SELECT id, tenant_id, product_id, kind, quantity, unit_price_cents,
           subtotal_cents, destination_id, invoice_id, note, created_at
    FROM transactions
"#;

/// Stored quantity of a product compared with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReconciliation {
    pub product_id: String,
    pub stored_quantity: i64,
    pub ledger_quantity: i64,
}

impl LedgerReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.stored_quantity == self.ledger_quantity
    }
}

/// Read-only access to the ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Movements of one product, newest first.
    pub async fn list_by_product(&self, tenant: &TenantId, product_id: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "{SELECT_TRANSACTION} WHERE tenant_id = ?1 AND product_id = ?2 ORDER BY created_at DESC, id"
        );
        let rows = sqlx::query_as::<_, Transaction>(&sql)
            .bind(tenant.as_str())
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// SALE rows linked to an invoice, in insertion order.
    pub async fn list_by_invoice(&self, tenant: &TenantId, invoice_id: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "{SELECT_TRANSACTION} WHERE tenant_id = ?1 AND invoice_id = ?2 ORDER BY created_at, rowid"
        );
        let rows = sqlx::query_as::<_, Transaction>(&sql)
            .bind(tenant.as_str())
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Movements with `from <= created_at < to`, oldest first.
    pub async fn list_between(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        debug!(tenant_id = %tenant, %from, %to, "Loading ledger range");

        let sql = format!(
            "{SELECT_TRANSACTION} WHERE tenant_id = ?1 AND created_at >= ?2 AND created_at < ?3 ORDER BY created_at, rowid"
        );
        let rows = sqlx::query_as::<_, Transaction>(&sql)
            .bind(tenant.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Most recent movements across all products.
    pub async fn recent(&self, tenant: &TenantId, limit: u32) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "{SELECT_TRANSACTION} WHERE tenant_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        );
        let rows = sqlx::query_as::<_, Transaction>(&sql)
            .bind(tenant.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Replays a product's ledger and compares it with the stored quantity.
    pub async fn reconcile(&self, tenant: &TenantId, product_id: &str) -> DbResult<LedgerReconciliation> {
        let stored: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1 AND tenant_id = ?2")
                .bind(product_id)
                .bind(tenant.as_str())
                .fetch_optional(&self.pool)
                .await?;

        let stored_quantity = stored.ok_or_else(|| DbError::not_found("Product", product_id))?;

        let ledger_quantity: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE kind WHEN 'PURCHASE' THEN quantity ELSE -quantity END), 0)
            FROM transactions
            WHERE tenant_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(tenant.as_str())
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerReconciliation {
            product_id: product_id.to_string(),
            stored_quantity,
            ledger_quantity,
        })
    }
}

// =============================================================================
// Write Helpers (used inside service transactions)
// =============================================================================

/// A ledger row about to be appended.
#[derive(Debug, Clone)]
pub(crate) struct LedgerEntry<'a> {
    pub product_id: &'a str,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub unit_price: Money,
    pub destination_id: Option<&'a str>,
    pub invoice_id: Option<&'a str>,
    pub note: Option<&'a str>,
}

/// Appends one row and returns it as stored.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    entry: LedgerEntry<'_>,
) -> DbResult<Transaction> {
    let subtotal = entry
        .unit_price
        .checked_multiply_quantity(entry.quantity)
        .ok_or_else(|| ValidationError::too_large("subtotal"))?;

    let txn = Transaction {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.as_str().to_string(),
        product_id: entry.product_id.to_string(),
        kind: entry.kind,
        quantity: entry.quantity,
        unit_price_cents: entry.unit_price.cents(),
        subtotal_cents: subtotal.cents(),
        destination_id: entry.destination_id.map(str::to_string),
        invoice_id: entry.invoice_id.map(str::to_string),
        note: entry.note.map(str::to_string),
        created_at: Utc::now(),
    };

    debug!(
        id = %txn.id,
        product_id = %txn.product_id,
        kind = %txn.kind,
        quantity = txn.quantity,
        "Appending ledger row"
    );

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, tenant_id, product_id, kind, quantity,
            unit_price_cents, subtotal_cents, destination_id, invoice_id, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&txn.id)
    .bind(&txn.tenant_id)
    .bind(&txn.product_id)
    .bind(txn.kind)
    .bind(txn.quantity)
    .bind(txn.unit_price_cents)
    .bind(txn.subtotal_cents)
    .bind(&txn.destination_id)
    .bind(&txn.invoice_id)
    .bind(&txn.note)
    .bind(txn.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(txn)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::test_support::{destination, product, setup};
    use chrono::Duration;
    use stockbook_core::{DeductRequest, ReplenishRequest, StockLine, TransactionKind};

    #[tokio::test]
    async fn test_ledger_matches_stored_quantity_after_movements() {
        let (db, tenant) = setup().await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;
        let d = destination(&db, &tenant, "Ward A").await;

        db.stock()
            .replenish_stock(
                &tenant,
                &ReplenishRequest {
                    product_id: p.id.clone(),
                    quantity: 7,
                    new_unit_cost_cents: None,
                    note: None,
                },
            )
            .await
            .unwrap();

        for kind in [TransactionKind::Sale, TransactionKind::Return] {
            db.stock()
                .deduct_stock(
                    &tenant,
                    &DeductRequest {
                        items: vec![StockLine::new(&p.id, 4)],
                        destination_id: Some(d.id.clone()),
                        kind,
                        note: None,
                    },
                )
                .await
                .unwrap();
        }

        let rec = db.ledger().reconcile(&tenant, &p.id).await.unwrap();
        assert_eq!(rec.stored_quantity, 9);
        assert!(rec.is_consistent());

        let rows = db.ledger().list_by_product(&tenant, &p.id).await.unwrap();
        assert_eq!(rows.len(), 4); // opening + replenish + sale + return
    }

    #[tokio::test]
    async fn test_list_between_and_recent() {
        let (db, tenant) = setup().await;
        let p = product(&db, &tenant, "Gauze", 3, 100).await;

        let now = chrono::Utc::now();
        let rows = db
            .ledger()
            .list_between(&tenant, now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, p.id);
        assert_eq!(rows[0].kind, TransactionKind::Purchase);

        let none = db
            .ledger()
            .list_between(&tenant, now + Duration::hours(1), now + Duration::hours(2))
            .await
            .unwrap();
        assert!(none.is_empty());

        assert_eq!(db.ledger().recent(&tenant, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_unknown_product() {
        let (db, tenant) = setup().await;
        assert!(db.ledger().reconcile(&tenant, "missing").await.is_err());
    }
}
