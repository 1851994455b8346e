//! # Dashboard Aggregations
//!
//! Read-only rollups feeding the dashboard cards and charts.
//!
//! ```text
//! ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │  Stock summary   │  │ Category shares  │  │  Invoice stats   │
//! │  in / low / out  │  │  top-N pie       │  │  paid rate       │
//! └──────────────────┘  └──────────────────┘  └──────────────────┘
//! ┌──────────────────┐  ┌──────────────────────────────────────────┐
//! │  Client stats    │  │  Daily rollups: sales vs purchases, net  │
//! └──────────────────┘  └──────────────────────────────────────────┘
//! ```
//!
//! Every function takes already-loaded rows; stockbook-db does the loading.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Category, Client, Invoice, InvoiceStatus, Product, Transaction, TransactionKind};

// =============================================================================
// Stock Summary
// =============================================================================

/// Stock level bucket of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    InStock,
    Low,
    Out,
}

impl StockLevel {
    pub fn classify(quantity: i64, low_threshold: i64) -> Self {
        if quantity <= 0 {
            StockLevel::Out
        } else if quantity <= low_threshold {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CriticalProduct {
    pub product_id: String,
    pub name: String,
    pub unit: String,
    pub quantity: i64,
    pub level: StockLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockSummary {
    pub total_products: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub low_threshold: i64,
    /// Low and out-of-stock products, emptiest first.
    pub critical: Vec<CriticalProduct>,
}

/// Buckets active products by stock level.
pub fn stock_summary(products: &[Product], low_threshold: i64) -> StockSummary {
    let mut summary = StockSummary {
        total_products: 0,
        in_stock: 0,
        low_stock: 0,
        out_of_stock: 0,
        low_threshold,
        critical: Vec::new(),
    };

    for product in products.iter().filter(|p| p.is_active) {
        summary.total_products += 1;
        let level = StockLevel::classify(product.quantity, low_threshold);
        match level {
            StockLevel::InStock => summary.in_stock += 1,
            StockLevel::Low => summary.low_stock += 1,
            StockLevel::Out => summary.out_of_stock += 1,
        }
        if level != StockLevel::InStock {
            summary.critical.push(CriticalProduct {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit: product.unit.clone(),
                quantity: product.quantity,
                level,
            });
        }
    }

    summary
        .critical
        .sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));
    summary
}

/// Value of stock on hand at cost and at sale price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockValuation {
    pub units: i64,
    pub at_cost: Money,
    pub at_sale_price: Money,
}

pub fn stock_valuation(products: &[Product]) -> StockValuation {
    products.iter().filter(|p| p.is_active).fold(
        StockValuation {
            units: 0,
            at_cost: Money::zero(),
            at_sale_price: Money::zero(),
        },
        |mut acc, p| {
            acc.units += p.quantity;
            acc.at_cost += p.purchase_price().multiply_quantity(p.quantity);
            acc.at_sale_price += p.sale_price().multiply_quantity(p.quantity);
            acc
        },
    )
}

// =============================================================================
// Category Distribution
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryShare {
    /// `None` for products without a category.
    pub category_id: Option<String>,
    pub name: String,
    pub product_count: usize,
}

/// Product count per category, largest first, limited to `top_n`.
pub fn category_distribution(
    products: &[Product],
    categories: &[Category],
    top_n: usize,
) -> Vec<CategoryShare> {
    let names: HashMap<&str, &str> = categories
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
    for product in products.iter().filter(|p| p.is_active) {
        *counts.entry(product.category_id.as_deref()).or_default() += 1;
    }

    let mut shares: Vec<CategoryShare> = counts
        .into_iter()
        .map(|(id, product_count)| CategoryShare {
            category_id: id.map(str::to_string),
            name: id
                .and_then(|id| names.get(id).copied())
                .unwrap_or("Uncategorized")
                .to_string(),
            product_count,
        })
        .collect();

    shares.sort_by(|a, b| {
        b.product_count
            .cmp(&a.product_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    shares.truncate(top_n);
    shares
}

// =============================================================================
// Invoice Statistics
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceStats {
    pub total: usize,
    pub paid: usize,
    pub unpaid: usize,
    pub pending: usize,
    /// Σ total of every invoice.
    pub billed: Money,
    /// Σ total of PAID invoices.
    pub revenue: Money,
    /// Σ total of UNPAID and PENDING invoices.
    pub outstanding: Money,
    /// paid / total, 0.0 when there are no invoices.
    pub payment_rate: f64,
}

pub fn invoice_stats(invoices: &[Invoice]) -> InvoiceStats {
    let mut stats = InvoiceStats {
        total: invoices.len(),
        paid: 0,
        unpaid: 0,
        pending: 0,
        billed: Money::zero(),
        revenue: Money::zero(),
        outstanding: Money::zero(),
        payment_rate: 0.0,
    };

    for invoice in invoices {
        stats.billed += invoice.total();
        match invoice.status {
            InvoiceStatus::Paid => {
                stats.paid += 1;
                stats.revenue += invoice.total();
            }
            InvoiceStatus::Unpaid => {
                stats.unpaid += 1;
                stats.outstanding += invoice.total();
            }
            InvoiceStatus::Pending => {
                stats.pending += 1;
                stats.outstanding += invoice.total();
            }
        }
    }

    if stats.total > 0 {
        stats.payment_rate = stats.paid as f64 / stats.total as f64;
    }
    stats
}

// =============================================================================
// Client Statistics
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientBilling {
    pub client_id: String,
    pub name: String,
    pub invoice_count: usize,
    pub billed: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientStats {
    pub total_clients: usize,
    pub with_email: usize,
    pub with_invoices: usize,
    /// Highest billed clients first.
    pub top_clients: Vec<ClientBilling>,
}

pub fn client_stats(clients: &[Client], invoices: &[Invoice], top_n: usize) -> ClientStats {
    let mut billing: HashMap<&str, (usize, Money)> = HashMap::new();
    for invoice in invoices {
        let entry = billing
            .entry(invoice.client_id.as_str())
            .or_insert((0, Money::zero()));
        entry.0 += 1;
        entry.1 += invoice.total();
    }

    let mut top_clients: Vec<ClientBilling> = clients
        .iter()
        .filter_map(|c| {
            billing
                .get(c.id.as_str())
                .map(|&(invoice_count, billed)| ClientBilling {
                    client_id: c.id.clone(),
                    name: c.name.clone(),
                    invoice_count,
                    billed,
                })
        })
        .collect();

    let with_invoices = top_clients.len();
    top_clients.sort_by(|a, b| b.billed.cmp(&a.billed).then_with(|| a.name.cmp(&b.name)));
    top_clients.truncate(top_n);

    ClientStats {
        total_clients: clients.len(),
        with_email: clients
            .iter()
            .filter(|c| c.email.as_deref().is_some_and(|e| !e.is_empty()))
            .count(),
        with_invoices,
        top_clients,
    }
}

// =============================================================================
// Daily Rollups
// =============================================================================

/// Money moved on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyRollup {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sales: Money,
    pub purchases: Money,
    pub returns: Money,
    /// sales − purchases
    pub net: Money,
}

/// One rollup per day in `from..=to`, zero-filled where nothing moved.
///
/// Transactions outside the range are ignored; an inverted range yields an
/// empty series.
pub fn daily_rollups(transactions: &[Transaction], from: NaiveDate, to: NaiveDate) -> Vec<DailyRollup> {
    if from > to {
        return Vec::new();
    }

    let mut days: Vec<DailyRollup> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|date| DailyRollup {
            date,
            sales: Money::zero(),
            purchases: Money::zero(),
            returns: Money::zero(),
            net: Money::zero(),
        })
        .collect();

    for txn in transactions {
        let date = day_of(&txn.created_at);
        if date < from || date > to {
            continue;
        }
        let Ok(index) = usize::try_from((date - from).num_days()) else {
            continue;
        };
        let day = &mut days[index];
        match txn.kind {
            TransactionKind::Sale => day.sales += txn.subtotal(),
            TransactionKind::Purchase => day.purchases += txn.subtotal(),
            TransactionKind::Return => day.returns += txn.subtotal(),
        }
    }

    for day in &mut days {
        day.net = day.sales - day.purchases;
    }
    days
}

fn day_of(at: &DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

// =============================================================================
// Unit Tests
// =============================================================================
