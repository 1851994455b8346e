//! # Invoicing Service
//!
//! Creates invoices together with the stock exit they bill for.
//!
//! ## Numbering
//! ```text
//! invoice_sequences(tenant_id, last_value)
//!
//!   INSERT … ON CONFLICT DO UPDATE SET last_value = last_value + 1
//!   RETURNING last_value            ──►  INV-000042
//! ```
//! The sequence is advanced inside the write transaction, so two invoices
//! can never receive the same number. Numbers already taken by a
//! caller-chosen invoice are skipped. A number handed out by
//! [`InvoiceService::generate_invoice_number`] and never used leaves a gap.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::WriteGate;
use crate::repository::client::{self, ClientRepository};
use crate::repository::destination;
use crate::repository::invoice::{InvoiceRepository, SELECT_INVOICE};
use crate::repository::ledger::{self, LedgerEntry};
use crate::repository::product::load_snapshot;
use crate::service::apply_decrements;
use stockbook_core::invoice::{format_invoice_number, InvoiceDocument, InvoiceTotals};
use stockbook_core::stock::plan_invoice_lines;
use stockbook_core::validation::validate_new_invoice;
use stockbook_core::{
    CoreError, Invoice, InvoiceStatus, NewInvoice, TaxRate, TenantId, TransactionKind,
};

#[derive(Debug, Clone)]
pub struct InvoiceService {
    pool: SqlitePool,
    gate: WriteGate,
    prefix: Arc<str>,
}

impl InvoiceService {
    pub fn new(pool: SqlitePool, gate: WriteGate, prefix: Arc<str>) -> Self {
        InvoiceService { pool, gate, prefix }
    }

    /// Creates an invoice and deducts its lines from stock, as one unit.
    ///
    /// ## What This Does
    /// 1. Checks the client (and destination, when given) exist
    /// 2. Takes the caller's number or reserves the next one
    /// 3. Plans the lines against a fresh read of stock
    /// 4. Writes the invoice, the decrements and one SALE row per line
    ///
    /// ## Returns
    /// * `Ok(Invoice)` - Stored invoice with server-computed totals
    /// * `Err(DbError::UniqueViolation)` - Caller-chosen number already used
    /// * `Err(DbError::Rejected(InsufficientStock))` - Nothing was written
    pub async fn create_invoice(&self, tenant: &TenantId, req: &NewInvoice) -> DbResult<Invoice> {
        validate_new_invoice(req)?;

        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        client::ensure_exists(&mut *tx, tenant, &req.client_id).await?;
        if let Some(destination_id) = req.destination_id.as_deref() {
            destination::ensure_exists(&mut *tx, tenant, destination_id).await?;
        }

        let invoice_number = match req.invoice_number.as_deref().map(str::trim) {
            Some(number) => {
                if number_taken(&mut *tx, tenant, number).await? {
                    warn!(tenant_id = %tenant, invoice_number = %number, "Invoice number already in use");
                    return Err(DbError::duplicate("invoice_number", number));
                }
                number.to_string()
            }
            None => reserve_number(&mut *tx, tenant, &self.prefix).await?,
        };

        let ids: Vec<&str> = req.lines.iter().map(|line| line.product_id.as_str()).collect();
        let products = load_snapshot(&mut *tx, tenant, &ids).await?;

        let plan = plan_invoice_lines(&req.lines, &products).map_err(|err| {
            warn!(tenant_id = %tenant, error = %err, "Invoice rejected");
            err
        })?;

        let totals = InvoiceTotals::from_subtotal(
            plan.subtotal(),
            TaxRate::from_bps(req.tax_rate_bps),
            req.tax_enabled,
        )?;

        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.as_str().to_string(),
            invoice_number,
            client_id: req.client_id.clone(),
            subtotal_cents: totals.subtotal.cents(),
            tax_rate_bps: req.tax_rate_bps,
            tax_enabled: req.tax_enabled,
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            status: req.status,
            created_at: now,
            updated_at: now,
        };

        // Header first: the ledger rows reference it
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, tenant_id, invoice_number, client_id, subtotal_cents, tax_rate_bps,
                tax_enabled, tax_cents, total_cents, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.tenant_id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.client_id)
        .bind(invoice.subtotal_cents)
        .bind(invoice.tax_rate_bps)
        .bind(invoice.tax_enabled)
        .bind(invoice.tax_cents)
        .bind(invoice.total_cents)
        .bind(invoice.status)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;

        apply_decrements(&mut *tx, tenant, &plan).await?;

        for line in &plan.lines {
            ledger::append(
                &mut *tx,
                tenant,
                LedgerEntry {
                    product_id: &line.product_id,
                    kind: TransactionKind::Sale,
                    quantity: line.quantity,
                    unit_price: line.unit_price(),
                    destination_id: req.destination_id.as_deref(),
                    invoice_id: Some(&invoice.id),
                    note: None,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            tenant_id = %tenant,
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            lines = plan.lines.len(),
            total = %totals.total,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Reserves and returns the next invoice number for the tenant.
    pub async fn generate_invoice_number(&self, tenant: &TenantId) -> DbResult<String> {
        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;
        let number = reserve_number(&mut *tx, tenant, &self.prefix).await?;
        tx.commit().await?;
        Ok(number)
    }

    /// Moves an invoice to another status.
    ///
    /// Any move is allowed except PAID → PENDING. Setting the current status
    /// again returns the invoice unchanged.
    pub async fn update_invoice_status(
        &self,
        tenant: &TenantId,
        invoice_id: &str,
        next: InvoiceStatus,
    ) -> DbResult<Invoice> {
        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        let sql = format!("{SELECT_INVOICE} WHERE id = ?1 AND tenant_id = ?2");
        let mut invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_id)
            .bind(tenant.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(invoice_id.to_string()))?;

        if invoice.status == next {
            debug!(invoice_id = %invoice_id, status = %next, "Status unchanged");
            return Ok(invoice);
        }

        let previous = invoice.status;
        invoice.status = previous.transition(invoice_id, next)?;
        invoice.updated_at = Utc::now();

        sqlx::query("UPDATE invoices SET status = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4")
            .bind(invoice.status)
            .bind(invoice.updated_at)
            .bind(invoice_id)
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            tenant_id = %tenant,
            invoice_id = %invoice_id,
            from = %previous,
            to = %invoice.status,
            "Invoice status changed"
        );
        Ok(invoice)
    }

    /// Deletes an invoice header.
    ///
    /// Its SALE rows stay in the ledger with `invoice_id` cleared, and the
    /// stock they took out is not restored.
    pub async fn delete_invoice(&self, tenant: &TenantId, invoice_id: &str) -> DbResult<()> {
        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        // Also clears invoice_id on the ledger rows (ON DELETE SET NULL)
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1 AND tenant_id = ?2")
            .bind(invoice_id)
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InvoiceNotFound(invoice_id.to_string()).into());
        }

        tx.commit().await?;

        info!(tenant_id = %tenant, invoice_id = %invoice_id, "Invoice deleted");
        Ok(())
    }

    /// Everything needed to print an invoice.
    pub async fn invoice_document(&self, tenant: &TenantId, invoice_id: &str) -> DbResult<InvoiceDocument> {
        let invoices = InvoiceRepository::new(self.pool.clone());
        let invoice = invoices.require(tenant, invoice_id).await?;
        let client = ClientRepository::new(self.pool.clone(), self.gate.clone())
            .require(tenant, &invoice.client_id)
            .await?;
        let lines = invoices.document_lines(tenant, invoice_id).await?;

        Ok(InvoiceDocument::new(&invoice, client, lines))
    }
}

async fn number_taken(conn: &mut SqliteConnection, tenant: &TenantId, number: &str) -> DbResult<bool> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM invoices WHERE tenant_id = ?1 AND invoice_number = ?2")
            .bind(tenant.as_str())
            .bind(number)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

async fn reserve_number(conn: &mut SqliteConnection, tenant: &TenantId, prefix: &str) -> DbResult<String> {
    loop {
        let next: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (tenant_id, last_value) VALUES (?1, 1)
            ON CONFLICT (tenant_id) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant.as_str())
        .fetch_one(&mut *conn)
        .await?;

        let number = format_invoice_number(prefix, next);
        if !number_taken(&mut *conn, tenant, &number).await? {
            return Ok(number);
        }
        debug!(tenant_id = %tenant, invoice_number = %number, "Skipping number already in use");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client, destination, product, setup};
    use std::collections::HashSet;
    use stockbook_core::{InvoiceLine, ValidationError};

    fn invoice(client_id: &str, lines: Vec<InvoiceLine>) -> NewInvoice {
        NewInvoice {
            invoice_number: None,
            client_id: client_id.to_string(),
            lines,
            tax_rate_bps: 2000,
            tax_enabled: true,
            status: InvoiceStatus::Unpaid,
            destination_id: None,
        }
    }

    #[tokio::test]
    async fn test_totals_and_sale_rows() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;
        let q = product(&db, &tenant, "Gauze", 10, 1000).await;

        let created = db
            .invoicing()
            .create_invoice(
                &tenant,
                &invoice(&c.id, vec![InvoiceLine::new(&p.id, 2), InvoiceLine::new(&q.id, 1)]),
            )
            .await
            .unwrap();

        assert_eq!(created.subtotal_cents, 2000);
        assert_eq!(created.tax_cents, 400);
        assert_eq!(created.total_cents, 2400);
        assert_eq!(created.invoice_number, "INV-000001");

        let rows = db.ledger().list_by_invoice(&tenant, &created.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.kind == TransactionKind::Sale));
        assert_eq!(rows.iter().map(|r| r.subtotal_cents).sum::<i64>(), created.subtotal_cents);

        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 8);
        assert_eq!(db.products().require(&tenant, &q.id).await.unwrap().quantity, 9);
    }

    #[tokio::test]
    async fn test_price_override_and_tax_disabled() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;

        let mut req = invoice(&c.id, vec![InvoiceLine::priced(&p.id, 3, 333)]);
        req.tax_enabled = false;
        let created = db.invoicing().create_invoice(&tenant, &req).await.unwrap();

        assert_eq!(created.subtotal_cents, 999);
        assert_eq!(created.tax_cents, 0);
        assert_eq!(created.total_cents, 999);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;
        let q = product(&db, &tenant, "Gauze", 1, 1000).await;

        let err = db
            .invoicing()
            .create_invoice(
                &tenant,
                &invoice(&c.id, vec![InvoiceLine::new(&p.id, 2), InvoiceLine::new(&q.id, 5)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::InsufficientStock { .. })));

        assert_eq!(db.invoices().count(&tenant).await.unwrap(), 0);
        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 10);
        assert_eq!(db.products().require(&tenant, &q.id).await.unwrap().quantity, 1);

        // The rolled back reservation does not burn a number
        let next = db
            .invoicing()
            .create_invoice(&tenant, &invoice(&c.id, vec![InvoiceLine::new(&p.id, 1)]))
            .await
            .unwrap();
        assert_eq!(next.invoice_number, "INV-000001");
    }

    #[tokio::test]
    async fn test_oversized_quantity_is_a_clean_shortfall() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 5, 100).await;

        let err = db
            .invoicing()
            .create_invoice(&tenant, &invoice(&c.id, vec![InvoiceLine::new(&p.id, i64::MAX)]))
            .await
            .unwrap_err();
        match err {
            DbError::Rejected(CoreError::InsufficientStock { shortfalls }) => {
                assert_eq!(shortfalls[0].requested, i64::MAX);
                assert_eq!(shortfalls[0].available, 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Override prices past the ceiling never reach the planner
        let mut req = invoice(&c.id, vec![InvoiceLine::priced(&p.id, 5, i64::MAX)]);
        req.tax_enabled = false;
        let err = db.invoicing().create_invoice(&tenant, &req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        assert_eq!(db.invoices().count(&tenant).await.unwrap(), 0);
        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_unknown_client_rejected() {
        let (db, tenant) = setup().await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;

        let err = db
            .invoicing()
            .create_invoice(
                &tenant,
                &invoice(&Uuid::new_v4().to_string(), vec![InvoiceLine::new(&p.id, 1)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::ClientNotFound(_))));
        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_destination_recorded_on_sale_rows() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let d = destination(&db, &tenant, "Front counter").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;

        let mut req = invoice(&c.id, vec![InvoiceLine::new(&p.id, 1)]);
        req.destination_id = Some(d.id.clone());
        let created = db.invoicing().create_invoice(&tenant, &req).await.unwrap();

        let rows = db.ledger().list_by_invoice(&tenant, &created.id).await.unwrap();
        assert_eq!(rows[0].destination_id.as_deref(), Some(d.id.as_str()));
    }

    #[tokio::test]
    async fn test_caller_number_must_be_unique_and_is_skipped_by_sequence() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;

        let mut req = invoice(&c.id, vec![InvoiceLine::new(&p.id, 1)]);
        req.invoice_number = Some("INV-000001".into());
        db.invoicing().create_invoice(&tenant, &req).await.unwrap();

        let err = db.invoicing().create_invoice(&tenant, &req).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 9);

        let generated = db
            .invoicing()
            .create_invoice(&tenant, &invoice(&c.id, vec![InvoiceLine::new(&p.id, 1)]))
            .await
            .unwrap();
        assert_eq!(generated.invoice_number, "INV-000002");
    }

    #[tokio::test]
    async fn test_generate_number_advances_per_tenant() {
        let (db, tenant) = setup().await;
        let other = db
            .tenants()
            .resolve_or_create("owner@bakery.example")
            .await
            .unwrap()
            .tenant_id();

        let svc = db.invoicing();
        assert_eq!(svc.generate_invoice_number(&tenant).await.unwrap(), "INV-000001");
        assert_eq!(svc.generate_invoice_number(&tenant).await.unwrap(), "INV-000002");
        assert_eq!(svc.generate_invoice_number(&other).await.unwrap(), "INV-000001");
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_distinct_numbers() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 100, 500).await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let db = db.clone();
            let tenant = tenant.clone();
            let req = invoice(&c.id, vec![InvoiceLine::new(&p.id, 1)]);
            tasks.spawn(async move { db.invoicing().create_invoice(&tenant, &req).await });
        }

        let mut numbers = HashSet::new();
        while let Some(result) = tasks.join_next().await {
            let created = result.unwrap().unwrap();
            assert!(numbers.insert(created.invoice_number));
        }

        assert_eq!(numbers.len(), 20);
        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 80);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;
        let created = db
            .invoicing()
            .create_invoice(&tenant, &invoice(&c.id, vec![InvoiceLine::new(&p.id, 1)]))
            .await
            .unwrap();

        let svc = db.invoicing();
        let pending = svc
            .update_invoice_status(&tenant, &created.id, InvoiceStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.status, InvoiceStatus::Pending);

        let paid = svc
            .update_invoice_status(&tenant, &created.id, InvoiceStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);

        let same = svc
            .update_invoice_status(&tenant, &created.id, InvoiceStatus::Paid)
            .await
            .unwrap();
        assert_eq!(same.status, InvoiceStatus::Paid);

        let err = svc
            .update_invoice_status(&tenant, &created.id, InvoiceStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::InvalidStatusTransition { .. })));

        let stored = db.invoices().require(&tenant, &created.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_delete_keeps_ledger_and_stock() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;
        let created = db
            .invoicing()
            .create_invoice(&tenant, &invoice(&c.id, vec![InvoiceLine::new(&p.id, 4)]))
            .await
            .unwrap();

        db.invoicing().delete_invoice(&tenant, &created.id).await.unwrap();

        assert!(db.invoices().get(&tenant, &created.id).await.unwrap().is_none());
        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 6);

        let sales: Vec<_> = db
            .ledger()
            .list_by_product(&tenant, &p.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.kind == TransactionKind::Sale)
            .collect();
        assert_eq!(sales.len(), 1);
        assert!(sales[0].invoice_id.is_none());

        let err = db.invoicing().delete_invoice(&tenant, &created.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::InvoiceNotFound(_))));

        // The refused delete rolled back and released its connection
        db.invoicing()
            .create_invoice(&tenant, &invoice(&c.id, vec![InvoiceLine::new(&p.id, 1)]))
            .await
            .unwrap();
        assert_eq!(db.products().require(&tenant, &p.id).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_invoice_document() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;
        let created = db
            .invoicing()
            .create_invoice(&tenant, &invoice(&c.id, vec![InvoiceLine::new(&p.id, 2)]))
            .await
            .unwrap();

        let doc = db.invoicing().invoice_document(&tenant, &created.id).await.unwrap();
        assert_eq!(doc.invoice_number, created.invoice_number);
        assert_eq!(doc.client.name, "Clinic");
        assert_eq!(doc.lines.len(), 1);
        assert_eq!(doc.lines[0].unit, "box");
        assert_eq!(doc.totals.total.cents(), 1200);
    }
}
