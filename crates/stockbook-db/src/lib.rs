//! # stockbook-db: Database Layer for Stockbook
//!
//! SQLite storage for Stockbook, and the only place stock is ever written.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  stockbook-app action (create_invoice)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │   │
//! │  │   │   Database   │   │   Services   │   │   Repositories   │   │   │
//! │  │   │  (pool.rs)   │   │ StockService │   │ products, ledger │   │   │
//! │  │   │              │──►│ InvoiceSvc   │──►│ invoices, clients│   │   │
//! │  │   │ SqlitePool   │   │ (atomic)     │   │ destinations ... │   │   │
//! │  │   │ WriteGate    │   └──────────────┘   └──────────────────┘   │   │
//! │  │   └──────────────┘   ┌──────────────┐   ┌──────────────────┐   │   │
//! │  │                      │  Analytics   │   │    Migrations    │   │   │
//! │  │                      │  (read side) │   │ 001_initial.sql  │   │   │
//! │  │                      └──────────────┘   └──────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, writer gate
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Tenant-scoped CRUD
//! - [`service`] - Atomic stock and invoice mutations
//! - [`analytics`] - Dashboard read model
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockbook.db")).await?;
//! let tenant = db.tenants().resolve_or_create("owner@pharmacy.example").await?;
//!
//! let invoice = db.invoicing().create_invoice(&tenant.tenant_id(), &new_invoice).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, WriteGate};

pub use analytics::{AnalyticsReader, Dashboard, DashboardQuery};
pub use repository::category::CategoryRepository;
pub use repository::client::ClientRepository;
pub use repository::destination::DestinationRepository;
pub use repository::invoice::{InvoiceFilter, InvoiceRepository};
pub use repository::ledger::{LedgerReconciliation, LedgerRepository};
pub use repository::product::ProductRepository;
pub use repository::tenant::TenantRepository;
pub use service::invoicing::InvoiceService;
pub use service::stock::StockService;
