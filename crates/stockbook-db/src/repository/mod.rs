//! # Repository Module
//!
//! Tenant-scoped database access for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Action                                                                │
//! │       │  db.products().search(&tenant, "parac", 20)                    │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── create / get / list / search                                      │
//! │  ├── update (never quantity)                                           │
//! │  └── set_image_url / soft_delete                                       │
//! │       │  SQL, always `WHERE tenant_id = ?`                             │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! │                                                                         │
//! │  Stock quantity is written ONLY by crate::service and by product       │
//! │  creation (opening stock), always together with a ledger row.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TenantRepository`](tenant::TenantRepository) - Owner email → tenant
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and search
//! - [`LedgerRepository`](ledger::LedgerRepository) - Read-only ledger queries
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice queries
//! - [`ClientRepository`](client::ClientRepository) - Client CRUD
//! - [`DestinationRepository`](destination::DestinationRepository) - Destinations
//! - [`CategoryRepository`](category::CategoryRepository) - Categories

pub mod category;
pub mod client;
pub mod destination;
pub mod invoice;
pub mod ledger;
pub mod product;
pub mod tenant;
