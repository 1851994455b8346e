//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! Stock rules, invoice math and dashboard aggregations, as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web dashboard (forms, charts)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ server actions                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockbook-app (actions)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockbook-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │   │  types  │ │  money  │ │  stock  │ │ invoice │ │analytics │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                stockbook-db (ledger services, SQLite)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Product, Transaction, Invoice, Client, ...) and requests
//! - [`money`] - Money type with integer arithmetic
//! - [`stock`] - The one stock-availability rule, shared by preview and mutation
//! - [`invoice`] - Invoice totals, status transitions, numbering format
//! - [`analytics`] - Dashboard aggregations
//! - [`validation`] - Field and request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::invoice::InvoiceTotals;
//! use stockbook_core::money::Money;
//! use stockbook_core::types::TaxRate;
//!
//! let lines = [(2, Money::from_cents(500)), (1, Money::from_cents(1000))];
//! let totals = InvoiceTotals::compute(lines, TaxRate::from_percentage(20.0), true).unwrap();
//!
//! assert_eq!(totals.subtotal.cents(), 2000);
//! assert_eq!(totals.total.cents(), 2400);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod invoice;
pub mod money;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, StockShortfall, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Products at or below this quantity count as "low stock" on the dashboard.
///
/// Zero is reported separately as "out of stock".
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 20;

/// Maximum number of lines in a single stock movement or invoice.
pub const MAX_LINES_PER_REQUEST: usize = 200;

/// Upper bound on a product's stock, and so on any single stock entry.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

/// Upper bound on any price in minor units (10,000,000.00).
///
/// With [`MAX_STOCK_QUANTITY`] this keeps one line's subtotal inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Prefix used for generated invoice numbers (`INV-000042`).
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";
