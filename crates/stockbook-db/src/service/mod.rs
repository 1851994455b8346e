//! # Ledger Services
//!
//! Every operation that changes stock, as one atomic unit each.
//!
//! ## Anatomy of a Stock Exit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request (core, no I/O)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WriteGate::acquire()            one writer at a time                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │   ├── referenced rows exist? (destination / client)                    │
//! │   ├── FRESH read of every product involved                             │
//! │   ├── plan_deduction()           the one availability rule (core)      │
//! │   ├── UPDATE … quantity >= ?     per product, guarded                  │
//! │   ├── INSERT transactions        one row per movement                  │
//! │   └── (INSERT invoices)          create_invoice only                   │
//! │  COMMIT  ── any error before this point rolls everything back          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`stock`] - deduct / replenish / preview
//! - [`invoicing`] - invoice creation, numbering, status, deletion

pub mod invoicing;
pub mod stock;

use sqlx::SqliteConnection;
use tracing::warn;

use crate::error::DbResult;
use crate::repository::product::decrement_quantity;
use stockbook_core::error::StockShortfall;
use stockbook_core::stock::DeductionPlan;
use stockbook_core::{CoreError, TenantId};

/// Applies the per-product decrements of an accepted plan.
///
/// The plan was computed on a fresh read under the writer gate, so the
/// guard only trips if another process wrote in between; that is reported
/// as the same `InsufficientStock` the planner would have raised.
pub(crate) async fn apply_decrements(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    plan: &DeductionPlan,
) -> DbResult<()> {
    for impact in &plan.impacts {
        let applied = decrement_quantity(&mut *conn, tenant, &impact.product_id, impact.requested).await?;
        if !applied {
            warn!(
                tenant_id = %tenant,
                product_id = %impact.product_id,
                requested = impact.requested,
                "Guarded decrement refused"
            );
            return Err(CoreError::InsufficientStock {
                shortfalls: vec![StockShortfall {
                    product_id: impact.product_id.clone(),
                    product_name: impact.product_name.clone(),
                    requested: impact.requested,
                    available: impact.available,
                }],
            }
            .into());
        }
    }
    Ok(())
}
