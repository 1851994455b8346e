//! # Domain Types
//!
//! Entities and request types used throughout Stockbook.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌───────────────┐   ┌───────────────────┐   ┌─────────────────┐       │
//! │  │   Product     │◄──│   Transaction     │──►│   Destination   │       │
//! │  │  quantity ≥ 0 │   │  (ledger row)     │   └─────────────────┘       │
//! │  │  sale price   │   │  kind, quantity   │                             │
//! │  │  purchase pr. │   │  unit price       │   ┌─────────────────┐       │
//! │  └──────┬────────┘   │  subtotal         │──►│    Invoice      │       │
//! │         │            └───────────────────┘   │  number, totals │       │
//! │  ┌──────▼────────┐                           │  status         │       │
//! │  │   Category    │                           └────────┬────────┘       │
//! │  │  (parent_id)  │                                    │                │
//! │  └───────────────┘                           ┌────────▼────────┐       │
//! │                                              │     Client      │       │
//! │  Every row is scoped by tenant_id.           └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tenant
// =============================================================================

/// Resolved tenant (business) identifier.
///
/// Built once at the request boundary from the authenticated principal and
/// then passed explicitly to every repository and service call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        TenantId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The business account owning all other rows.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tenant {
    pub id: String,
    /// Normalised (trimmed, lower-case) email of the owning principal.
    pub owner_email: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn tenant_id(&self) -> TenantId {
        TenantId::new(self.id.clone())
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points: 2000 bps = 20%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage such as `20.0`.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// The rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// The kind of stock movement recorded in the ledger.
///
/// ```text
/// PURCHASE  stock in   (replenishment from a supplier)
/// SALE      stock out  (sold, optionally invoiced)
/// RETURN    stock out  (sent back to a supplier or other destination)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Purchase,
    Sale,
    Return,
}

impl TransactionKind {
    /// Whether this movement takes stock out of the shelf.
    #[inline]
    pub const fn is_outbound(&self) -> bool {
        matches!(self, TransactionKind::Sale | TransactionKind::Return)
    }

    /// Signed effect of `quantity` units of this kind on product stock.
    #[inline]
    pub const fn stock_delta(&self, quantity: i64) -> i64 {
        if self.is_outbound() {
            -quantity
        } else {
            quantity
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "PURCHASE",
            TransactionKind::Sale => "SALE",
            TransactionKind::Return => "RETURN",
        }
    }
}

impl Default for TransactionKind {
    fn default() -> Self {
        TransactionKind::Sale
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Payment status of an invoice. Allowed moves live in [`crate::invoice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    Pending,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 3] = [
        InvoiceStatus::Paid,
        InvoiceStatus::Unpaid,
        InvoiceStatus::Pending,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Unpaid => "UNPAID",
            InvoiceStatus::Pending => "PENDING",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Category
// =============================================================================

/// Product category; `parent_id` makes it a sub-category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub parent_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `quantity` is only ever changed by the ledger services in stockbook-db.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub tenant_id: String,

    pub name: String,

    /// Unit of measure shown next to quantities ("box", "tablet", "kg").
    pub unit: String,

    /// Units on hand, never below zero.
    pub quantity: i64,

    /// Unit sale price in minor units.
    pub sale_price_cents: i64,

    /// Unit purchase price (cost) in minor units.
    pub purchase_price_cents: i64,

    pub category_id: Option<String>,

    /// Public URL of the product image in object storage.
    pub image_url: Option<String>,

    /// Soft-delete flag; ledger rows keep referencing inactive products.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Whether current stock covers `quantity` units.
    #[inline]
    pub fn can_cover(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }
}

// =============================================================================
// Transaction (ledger row)
// =============================================================================

/// One immutable stock movement.
///
/// Uses the snapshot pattern: `unit_price_cents` is frozen at the time of
/// the movement so later price edits never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub kind: TransactionKind,
    /// Units moved, always > 0; direction comes from `kind`.
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents
    pub subtotal_cents: i64,
    pub destination_id: Option<String>,
    pub invoice_id: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Effect of this row on product stock.
    #[inline]
    pub fn stock_delta(&self) -> i64 {
        self.kind.stock_delta(self.quantity)
    }
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub tenant_id: String,
    /// Human-readable number, unique per tenant (`INV-000042`).
    pub invoice_number: String,
    pub client_id: String,
    /// Σ subtotal of the invoice's ledger rows.
    pub subtotal_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_enabled: bool,
    pub tax_cents: i64,
    /// subtotal + tax (tax is zero when disabled)
    pub total_cents: i64,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Client & Destination
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Billing address, printed on invoices.
    pub address: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Where outgoing stock goes (a ward, a branch, a supplier).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Destination {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

/// One product + quantity in a stock exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLine {
    pub product_id: String,
    pub quantity: i64,
}

impl StockLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        StockLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Stock exit: all lines succeed together or none do.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeductRequest {
    pub items: Vec<StockLine>,
    pub destination_id: Option<String>,
    /// SALE or RETURN.
    #[serde(default)]
    pub kind: TransactionKind,
    pub note: Option<String>,
}

/// Stock entry for a single product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReplenishRequest {
    pub product_id: String,
    pub quantity: i64,
    /// New unit purchase price; also the price recorded on the ledger row.
    pub new_unit_cost_cents: Option<i64>,
    pub note: Option<String>,
}

/// One invoice line; the unit price defaults to the product's sale price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
}

impl InvoiceLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        InvoiceLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: None,
        }
    }

    pub fn priced(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        InvoiceLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: Some(unit_price_cents),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInvoice {
    /// Caller-chosen number; generated from the tenant sequence when absent.
    pub invoice_number: Option<String>,
    pub client_id: String,
    pub lines: Vec<InvoiceLine>,
    pub tax_rate_bps: u32,
    pub tax_enabled: bool,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub destination_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub unit: String,
    /// Opening stock, recorded as a PURCHASE ledger row when > 0.
    #[serde(default)]
    pub opening_quantity: i64,
    pub sale_price_cents: i64,
    pub purchase_price_cents: i64,
    pub category_id: Option<String>,
    pub image_url: Option<String>,
}

/// Editable product details. Quantity is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: String,
    pub unit: String,
    pub sale_price_cents: i64,
    pub purchase_price_cents: i64,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDestination {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
