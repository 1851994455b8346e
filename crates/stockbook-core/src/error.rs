//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbook-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  stockbook-app errors                                                  │
//! │  └── ApiError         - What the dashboard sees (serialized)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Stock Shortfall
// =============================================================================

/// One product that cannot cover the quantity requested from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockShortfall {
    pub product_id: String,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

impl fmt::Display for StockShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (requested {}, available {})",
            self.product_name, self.requested, self.available
        )
    }
}

fn join_shortfalls(shortfalls: &[StockShortfall]) -> String {
    shortfalls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. Raised inside a database
/// transaction they abort the whole transaction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product does not exist for the tenant, or was soft-deleted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// One or more products cannot cover the requested quantities.
    ///
    /// ## User Workflow
    /// ```text
    /// Stock exit: [Paracetamol × 10, Gauze × 2]
    ///      │
    ///      ▼
    /// Fresh stock: Paracetamol=5, Gauze=40
    ///      │
    ///      ▼
    /// InsufficientStock { shortfalls: [Paracetamol (requested 10, available 5)] }
    ///      │
    ///      ▼
    /// Nothing written; UI lists every short product
    /// ```
    #[error("Insufficient stock: {}", join_shortfalls(.shortfalls))]
    InsufficientStock { shortfalls: Vec<StockShortfall> },

    /// Destination referenced by a stock exit does not exist.
    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Invoice status change not allowed by the transition table.
    #[error("Invoice {invoice_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        invoice_id: String,
        from: String,
        to: String,
    },

    /// Client still owns invoices and cannot be deleted.
    #[error("Client {client_id} has {invoice_count} invoice(s) and cannot be deleted")]
    ClientHasInvoices {
        client_id: String,
        invoice_count: i64,
    },

    /// Destination is referenced by ledger rows and cannot be deleted.
    #[error("Destination {destination_id} is used by {movement_count} stock movement(s)")]
    DestinationInUse {
        destination_id: String,
        movement_count: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// An amount or quantity grew past what can be stored.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn too_large(field: impl Into<String>) -> Self {
        ValidationError::TooLarge {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_lists_every_product() {
        let err = CoreError::InsufficientStock {
            shortfalls: vec![
                StockShortfall {
                    product_id: "p1".to_string(),
                    product_name: "Paracetamol 500mg".to_string(),
                    requested: 10,
                    available: 5,
                },
                StockShortfall {
                    product_id: "p2".to_string(),
                    product_name: "Gauze".to_string(),
                    requested: 3,
                    available: 0,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock: Paracetamol 500mg (requested 10, available 5), \
             Gauze (requested 3, available 0)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("address").to_string(),
            "address is required"
        );
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
