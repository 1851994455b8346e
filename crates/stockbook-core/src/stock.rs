//! # Stock Availability
//!
//! The single rule deciding whether a stock exit may happen.
//!
//! ## One Validator, Two Callers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Stock exit form ──► preview_deduction() ──┐                            │
//! │  (read-only pre-check)                     │                            │
//! │                                            ▼                            │
//! │                                   plan_deduction()  ◄── THIS MODULE     │
//! │                                            ▲                            │
//! │  deduct_stock() / create_invoice() ────────┘                            │
//! │  (inside the DB transaction, on a FRESH read of stock)                 │
//! │                                                                         │
//! │  The UI never re-implements the rule, so the two cannot drift.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## All-or-Nothing
//! Quantities are summed per product before comparing with stock, and every
//! short product is reported, not just the first one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, StockShortfall, ValidationError};
use crate::money::Money;
use crate::types::{InvoiceLine, Product, StockLine};

/// A requested line after product lookup and pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlannedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl PlannedLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Net effect of a plan on one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockImpact {
    pub product_id: String,
    pub product_name: String,
    pub available: i64,
    pub requested: i64,
    pub remaining: i64,
}

/// An accepted stock exit, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeductionPlan {
    /// One entry per requested line, in request order.
    pub lines: Vec<PlannedLine>,
    /// One entry per distinct product, in order of first appearance.
    pub impacts: Vec<StockImpact>,
    /// Σ line subtotals, checked when the plan was built.
    pub subtotal_cents: i64,
}

impl DeductionPlan {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Units leaving stock; every impact is covered, so this is bounded by stock.
    pub fn total_units(&self) -> i64 {
        self.impacts.iter().map(|i| i.requested).sum()
    }
}

/// Plans a stock exit priced at each product's sale price.
///
/// ## Arguments
/// * `lines` - Requested product/quantity pairs
/// * `products` - Current stock snapshot keyed by product id
///
/// ## Returns
/// * `Ok(DeductionPlan)` - Every product covers its summed request
/// * `Err(CoreError::ProductNotFound)` - Unknown or inactive product
/// * `Err(CoreError::InsufficientStock)` - One entry per short product
///
/// ## Example
/// ```rust,ignore
/// let plan = plan_deduction(&[StockLine::new(&p.id, 10)], &snapshot)?;
/// ```
pub fn plan_deduction(
    lines: &[StockLine],
    products: &HashMap<String, Product>,
) -> CoreResult<DeductionPlan> {
    let requests: Vec<(&str, i64, Option<i64>)> = lines
        .iter()
        .map(|l| (l.product_id.as_str(), l.quantity, None))
        .collect();
    plan(&requests, products)
}

/// Plans the stock exit behind an invoice, honouring per-line price overrides.
pub fn plan_invoice_lines(
    lines: &[InvoiceLine],
    products: &HashMap<String, Product>,
) -> CoreResult<DeductionPlan> {
    let requests: Vec<(&str, i64, Option<i64>)> = lines
        .iter()
        .map(|l| (l.product_id.as_str(), l.quantity, l.unit_price_cents))
        .collect();
    plan(&requests, products)
}

fn plan(
    requests: &[(&str, i64, Option<i64>)],
    products: &HashMap<String, Product>,
) -> CoreResult<DeductionPlan> {
    let mut order: Vec<&Product> = Vec::new();
    let mut requested: HashMap<&str, i64> = HashMap::new();

    for &(product_id, quantity, _) in requests {
        let product = products
            .get(product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let total = requested.entry(product_id).or_insert_with(|| {
            order.push(product);
            0
        });
        // A saturated request can never be covered, so it still reports as short
        *total = total.saturating_add(quantity);
    }

    let mut impacts = Vec::with_capacity(order.len());
    let mut shortfalls = Vec::new();

    for product in order {
        let wanted = requested[product.id.as_str()];

        if !product.can_cover(wanted) {
            shortfalls.push(StockShortfall {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                requested: wanted,
                available: product.quantity,
            });
            continue;
        }

        impacts.push(StockImpact {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            available: product.quantity,
            requested: wanted,
            remaining: product.quantity - wanted,
        });
    }

    if !shortfalls.is_empty() {
        return Err(CoreError::InsufficientStock { shortfalls });
    }

    // Every quantity below is covered by stock, so only prices can push a
    // figure past i64.
    let mut lines = Vec::with_capacity(requests.len());
    let mut subtotal = Money::zero();

    for &(product_id, quantity, price_override) in requests {
        let Some(product) = products.get(product_id) else {
            continue;
        };

        let unit_price = price_override
            .map(Money::from_cents)
            .unwrap_or_else(|| product.sale_price());
        let line_subtotal = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| ValidationError::too_large("subtotal"))?;
        subtotal = subtotal
            .checked_add(line_subtotal)
            .ok_or_else(|| ValidationError::too_large("subtotal"))?;

        lines.push(PlannedLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price_cents: unit_price.cents(),
            subtotal_cents: line_subtotal.cents(),
        });
    }

    Ok(DeductionPlan {
        lines,
        impacts,
        subtotal_cents: subtotal.cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
