//! # Stock Mutation Service
//!
//! Deduct, replenish and preview. The only code that changes
//! `products.quantity` after a product is created.
//!
//! ## Pricing of Ledger Rows
//! ```text
//! SALE      unit price = product sale price
//! RETURN    unit price = product purchase price (goods go back at cost)
//! PURCHASE  unit price = new unit cost if given, else current purchase price
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::pool::WriteGate;
use crate::repository::destination;
use crate::repository::ledger::{self, LedgerEntry};
use crate::repository::product::{increment_quantity, load_snapshot};
use crate::service::apply_decrements;
use stockbook_core::stock::{plan_deduction, DeductionPlan};
use stockbook_core::validation::{
    validate_deduct_request, validate_preview_lines, validate_replenish_request,
};
use stockbook_core::{
    CoreError, DeductRequest, Money, Product, ReplenishRequest, StockLine, TenantId, Transaction,
    TransactionKind, ValidationError, MAX_STOCK_QUANTITY,
};

/// Stock deduction and replenishment.
#[derive(Debug, Clone)]
pub struct StockService {
    pool: SqlitePool,
    gate: WriteGate,
}

impl StockService {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        StockService { pool, gate }
    }

    /// Takes stock out for a destination, all lines or none.
    ///
    /// ## Arguments
    /// * `tenant` - Resolved tenant
    /// * `req` - Lines, destination and kind (SALE or RETURN)
    ///
    /// ## Returns
    /// * `Ok(Vec<Transaction>)` - One ledger row per distinct product
    /// * `Err(DbError::Rejected(InsufficientStock))` - Every short product listed,
    ///   nothing written
    /// * `Err(DbError::Rejected(DestinationNotFound | ProductNotFound | Validation))`
    ///
    /// ## Example
    /// ```rust,ignore
    /// let rows = db.stock().deduct_stock(&tenant, &DeductRequest {
    ///     items: vec![StockLine::new(&aspirin.id, 10)],
    ///     destination_id: Some(ward.id.clone()),
    ///     kind: TransactionKind::Sale,
    ///     note: None,
    /// }).await?;
    /// ```
    pub async fn deduct_stock(&self, tenant: &TenantId, req: &DeductRequest) -> DbResult<Vec<Transaction>> {
        validate_deduct_request(req)?;
        let destination_id = req
            .destination_id
            .as_deref()
            .ok_or_else(|| ValidationError::required("destination_id"))?;

        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        destination::ensure_exists(&mut *tx, tenant, destination_id).await?;

        let ids: Vec<&str> = req.items.iter().map(|line| line.product_id.as_str()).collect();
        let products = load_snapshot(&mut *tx, tenant, &ids).await?;

        let plan = plan_deduction(&req.items, &products).map_err(|err| {
            warn!(tenant_id = %tenant, error = %err, "Stock deduction rejected");
            err
        })?;

        apply_decrements(&mut *tx, tenant, &plan).await?;

        let mut rows = Vec::with_capacity(plan.impacts.len());
        for impact in &plan.impacts {
            let unit_price = products
                .get(&impact.product_id)
                .map(|p| exit_price(p, req.kind))
                .unwrap_or_default();

            let row = ledger::append(
                &mut *tx,
                tenant,
                LedgerEntry {
                    product_id: &impact.product_id,
                    kind: req.kind,
                    quantity: impact.requested,
                    unit_price,
                    destination_id: Some(destination_id),
                    invoice_id: None,
                    note: req.note.as_deref(),
                },
            )
            .await?;
            rows.push(row);
        }

        tx.commit().await?;

        info!(
            tenant_id = %tenant,
            destination_id = %destination_id,
            kind = %req.kind,
            products = rows.len(),
            units = plan.total_units(),
            "Stock deducted"
        );
        Ok(rows)
    }

    /// Adds stock to one product and records a PURCHASE.
    ///
    /// When `new_unit_cost_cents` is given it becomes the product's purchase
    /// price and the price on the ledger row. The resulting stock may not
    /// exceed `MAX_STOCK_QUANTITY`.
    pub async fn replenish_stock(&self, tenant: &TenantId, req: &ReplenishRequest) -> DbResult<Transaction> {
        validate_replenish_request(req)?;

        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        let product = load_snapshot(&mut *tx, tenant, &[req.product_id.as_str()])
            .await?
            .remove(&req.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(req.product_id.clone()))?;

        let new_quantity = product
            .quantity
            .checked_add(req.quantity)
            .filter(|q| *q <= MAX_STOCK_QUANTITY)
            .ok_or_else(|| {
                warn!(
                    tenant_id = %tenant,
                    product_id = %product.id,
                    on_hand = product.quantity,
                    quantity = req.quantity,
                    "Replenish would exceed the stock ceiling"
                );
                ValidationError::too_large("quantity")
            })?;

        let unit_cost = req
            .new_unit_cost_cents
            .map(Money::from_cents)
            .unwrap_or_else(|| product.purchase_price());

        let updated = increment_quantity(
            &mut *tx,
            tenant,
            &product.id,
            req.quantity,
            req.new_unit_cost_cents,
        )
        .await?;
        if !updated {
            return Err(CoreError::ProductNotFound(req.product_id.clone()).into());
        }

        let row = ledger::append(
            &mut *tx,
            tenant,
            LedgerEntry {
                product_id: &product.id,
                kind: TransactionKind::Purchase,
                quantity: req.quantity,
                unit_price: unit_cost,
                destination_id: None,
                invoice_id: None,
                note: req.note.as_deref(),
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            tenant_id = %tenant,
            product_id = %product.id,
            quantity = req.quantity,
            new_quantity,
            unit_cost = %unit_cost,
            "Stock replenished"
        );
        Ok(row)
    }

    /// Runs the availability rule on current stock without writing.
    ///
    /// For form pre-checks only; the mutation re-checks on a fresh read.
    pub async fn preview_deduction(&self, tenant: &TenantId, lines: &[StockLine]) -> DbResult<DeductionPlan> {
        validate_preview_lines(lines)?;
        debug!(tenant_id = %tenant, lines = lines.len(), "Previewing deduction");

        let mut conn = self.pool.acquire().await?;
        let ids: Vec<&str> = lines.iter().map(|line| line.product_id.as_str()).collect();
        let products = load_snapshot(&mut *conn, tenant, &ids).await?;

        Ok(plan_deduction(lines, &products)?)
    }
}

fn exit_price(product: &Product, kind: TransactionKind) -> Money {
    match kind {
        TransactionKind::Return => product.purchase_price(),
        _ => product.sale_price(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
