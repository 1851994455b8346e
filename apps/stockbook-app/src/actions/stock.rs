//! # Stock Actions
//!
//! ## Deduct Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "Stock exit" form                                                      │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ Destination: Ward A        Kind: SALE                         │     │
//! │  │ Aspirin ×10   Gauze ×2   [+ line]                             │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │       │  typing        ──► preview_deduction (read-only hints)          │
//! │       │  submit        ──► deduct_stock (authoritative, atomic)         │
//! │       ▼                                                                 │
//! │  Ok: one ledger row per product                                         │
//! │  INSUFFICIENT_STOCK: every short product listed, nothing changed        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{info, warn};

use crate::actions::clamp_limit;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;
use stockbook_core::stock::DeductionPlan;
use stockbook_core::{DeductRequest, ReplenishRequest, StockLine, Transaction};
use stockbook_db::LedgerReconciliation;

/// Takes stock out for a destination, all lines or none.
pub async fn deduct_stock(
    state: &AppState,
    ctx: &RequestContext,
    req: DeductRequest,
) -> Result<Vec<Transaction>, ApiError> {
    match state.db().stock().deduct_stock(ctx.tenant(), &req).await {
        Ok(rows) => {
            info!(tenant_id = %ctx.tenant(), movements = rows.len(), "deduct_stock action");
            Ok(rows)
        }
        Err(err) => {
            let err = ApiError::from(err);
            warn!(tenant_id = %ctx.tenant(), code = ?err.code, "deduct_stock refused");
            Err(err)
        }
    }
}

/// Records a delivery: adds stock and optionally updates the unit cost.
pub async fn replenish_stock(
    state: &AppState,
    ctx: &RequestContext,
    req: ReplenishRequest,
) -> Result<Transaction, ApiError> {
    Ok(state.db().stock().replenish_stock(ctx.tenant(), &req).await?)
}

/// Availability check for the form; does not reserve anything.
pub async fn preview_deduction(
    state: &AppState,
    ctx: &RequestContext,
    lines: Vec<StockLine>,
) -> Result<DeductionPlan, ApiError> {
    Ok(state.db().stock().preview_deduction(ctx.tenant(), &lines).await?)
}

/// Every movement of one product, newest first.
pub async fn product_history(
    state: &AppState,
    ctx: &RequestContext,
    product_id: &str,
) -> Result<Vec<Transaction>, ApiError> {
    state.db().products().require(ctx.tenant(), product_id).await?;
    Ok(state.db().ledger().list_by_product(ctx.tenant(), product_id).await?)
}

pub async fn recent_movements(
    state: &AppState,
    ctx: &RequestContext,
    limit: Option<u32>,
) -> Result<Vec<Transaction>, ApiError> {
    Ok(state.db().ledger().recent(ctx.tenant(), clamp_limit(limit)).await?)
}

/// Compares a product's stored quantity with its ledger.
pub async fn reconcile_product(
    state: &AppState,
    ctx: &RequestContext,
    product_id: &str,
) -> Result<LedgerReconciliation, ApiError> {
    let report = state.db().ledger().reconcile(ctx.tenant(), product_id).await?;
    if !report.is_consistent() {
        warn!(
            tenant_id = %ctx.tenant(),
            product_id = %product_id,
            stored = report.stored_quantity,
            ledger = report.ledger_quantity,
            "Stock does not match ledger"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::destination::create_destination;
    use crate::actions::product::create_product;
    use crate::error::ErrorCode;
    use crate::test_support::signed_in;
    use stockbook_core::{NewDestination, NewProduct, TransactionKind};

    async fn fixture(state: &AppState, ctx: &RequestContext, qty: i64) -> (String, String) {
        let product = create_product(
            state,
            ctx,
            NewProduct {
                name: "Gauze".into(),
                unit: "pack".into(),
                opening_quantity: qty,
                sale_price_cents: 180,
                purchase_price_cents: 90,
                category_id: None,
                image_url: None,
            },
        )
        .await
        .unwrap();
        let destination = create_destination(
            state,
            ctx,
            NewDestination { name: "Ward A".into(), description: None },
        )
        .await
        .unwrap();
        (product.id, destination.id)
    }

    #[tokio::test]
    async fn test_deduct_and_history() {
        let (state, ctx) = signed_in().await;
        let (product_id, destination_id) = fixture(&state, &ctx, 10).await;

        let rows = deduct_stock(
            &state,
            &ctx,
            DeductRequest {
                items: vec![StockLine::new(&product_id, 4)],
                destination_id: Some(destination_id),
                kind: TransactionKind::Sale,
                note: Some("Morning round".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 1);

        let history = product_history(&state, &ctx, &product_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().map(|t| t.stock_delta()).sum::<i64>(), 6);

        assert!(reconcile_product(&state, &ctx, &product_id).await.unwrap().is_consistent());
        assert_eq!(recent_movements(&state, &ctx, Some(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shortfall_reaches_the_caller() {
        let (state, ctx) = signed_in().await;
        let (product_id, destination_id) = fixture(&state, &ctx, 5).await;

        let err = deduct_stock(
            &state,
            &ctx,
            DeductRequest {
                items: vec![StockLine::new(&product_id, 10)],
                destination_id: Some(destination_id),
                kind: TransactionKind::Sale,
                note: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.shortfalls[0].available, 5);
        assert_eq!(err.shortfalls[0].requested, 10);
    }

    #[tokio::test]
    async fn test_missing_destination_is_a_validation_error() {
        let (state, ctx) = signed_in().await;
        let (product_id, _) = fixture(&state, &ctx, 5).await;

        let err = deduct_stock(
            &state,
            &ctx,
            DeductRequest {
                items: vec![StockLine::new(&product_id, 1)],
                destination_id: None,
                kind: TransactionKind::Sale,
                note: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_replenish_and_preview() {
        let (state, ctx) = signed_in().await;
        let (product_id, _) = fixture(&state, &ctx, 5).await;

        replenish_stock(
            &state,
            &ctx,
            ReplenishRequest {
                product_id: product_id.clone(),
                quantity: 20,
                new_unit_cost_cents: Some(75),
                note: None,
            },
        )
        .await
        .unwrap();

        let plan = preview_deduction(&state, &ctx, vec![StockLine::new(&product_id, 25)])
            .await
            .unwrap();
        assert_eq!(plan.impacts[0].available, 25);
        assert_eq!(plan.impacts[0].remaining, 0);
    }
}
