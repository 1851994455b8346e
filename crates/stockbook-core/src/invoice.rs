//! # Invoice Rules
//!
//! Totals, status transitions and numbering for invoices.
//!
//! ## Totals
//! ```text
//! lines:     2 × 5.00  +  1 × 10.00
//! subtotal:  20.00                    Σ qty × price (= Σ ledger subtotals)
//! tax:       20.00 × 20% = 4.00       once, on the subtotal, if enabled
//! total:     24.00
//! ```
//!
//! ## Status Transitions
//! ```text
//!            ┌──────────────┐
//!            ▼              │ (manual correction)
//!        ┌────────┐     ┌───┴────┐
//!  new ─►│ UNPAID │────►│  PAID  │
//!        └───┬────┘     └────────┘
//!            │  ▲           ▲
//!            ▼  │           │
//!        ┌──────┴─┐         │
//!        │PENDING │─────────┘
//!        └────────┘
//! ```
//! PAID → PENDING is the only rejected move.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Client, Invoice, InvoiceStatus, TaxRate};

// =============================================================================
// Totals
// =============================================================================

/// Computed money figures for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl InvoiceTotals {
    /// Computes totals from `(quantity, unit_price)` pairs.
    ///
    /// ```rust
    /// use stockbook_core::invoice::InvoiceTotals;
    /// use stockbook_core::money::Money;
    /// use stockbook_core::types::TaxRate;
    ///
    /// let totals = InvoiceTotals::compute(
    ///     [(2, Money::from_cents(500)), (1, Money::from_cents(1000))],
    ///     TaxRate::from_bps(2000),
    ///     false,
    /// )
    /// .unwrap();
    /// assert_eq!(totals.total.cents(), 2000);
    /// ```
    pub fn compute<I>(lines: I, tax_rate: TaxRate, tax_enabled: bool) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (i64, Money)>,
    {
        let mut subtotal = Money::zero();
        for (qty, price) in lines {
            subtotal = price
                .checked_multiply_quantity(qty)
                .and_then(|line| subtotal.checked_add(line))
                .ok_or_else(|| ValidationError::too_large("subtotal"))?;
        }
        Self::from_subtotal(subtotal, tax_rate, tax_enabled)
    }

    /// Adds tax to a subtotal. Fails only if the total would not fit in `i64`.
    pub fn from_subtotal(subtotal: Money, tax_rate: TaxRate, tax_enabled: bool) -> CoreResult<Self> {
        let tax = if tax_enabled {
            subtotal.calculate_tax(tax_rate)
        } else {
            Money::zero()
        };
        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| ValidationError::too_large("total"))?;

        Ok(InvoiceTotals { subtotal, tax, total })
    }
}

// =============================================================================
// Status Transitions
// =============================================================================

impl InvoiceStatus {
    /// Whether an invoice in `self` may be moved to `next`.
    ///
    /// Moving to the current status is allowed and changes nothing.
    pub const fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (*self, next),
            (Unpaid, Unpaid)
                | (Paid, Paid)
                | (Pending, Pending)
                | (Unpaid, Paid)
                | (Unpaid, Pending)
                | (Pending, Paid)
                | (Pending, Unpaid)
                | (Paid, Unpaid)
        )
    }

    /// Validates a transition, naming the invoice in the error.
    pub fn transition(&self, invoice_id: &str, next: InvoiceStatus) -> CoreResult<InvoiceStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition {
                invoice_id: invoice_id.to_string(),
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// Formats a sequence value as an invoice number: `INV-000042`.
pub fn format_invoice_number(prefix: &str, sequence: i64) -> String {
    format!("{}-{:06}", prefix, sequence)
}

// =============================================================================
// Printable Document
// =============================================================================

/// One printable invoice line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDocumentLine {
    pub product_name: String,
    pub unit: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Everything the PDF renderer needs, fully populated.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    pub client: Client,
    pub lines: Vec<InvoiceDocumentLine>,
    pub tax_rate_percent: f64,
    pub totals: InvoiceTotals,
}

impl InvoiceDocument {
    pub fn new(invoice: &Invoice, client: Client, lines: Vec<InvoiceDocumentLine>) -> Self {
        InvoiceDocument {
            invoice_number: invoice.invoice_number.clone(),
            status: invoice.status,
            issued_at: invoice.created_at,
            client,
            lines,
            tax_rate_percent: if invoice.tax_enabled {
                invoice.tax_rate().percentage()
            } else {
                0.0
            },
            totals: InvoiceTotals {
                subtotal: invoice.subtotal(),
                tax: Money::from_cents(invoice.tax_cents),
                total: invoice.total(),
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_with_tax() {
        let totals = InvoiceTotals::compute(
            [(2, Money::from_cents(500)), (1, Money::from_cents(1000))],
            TaxRate::from_bps(2000),
            true,
        )
        .unwrap();
        assert_eq!(totals.subtotal.cents(), 2000);
        assert_eq!(totals.tax.cents(), 400);
        assert_eq!(totals.total.cents(), 2400);
    }

    #[test]
    fn test_totals_tax_disabled() {
        let totals = InvoiceTotals::compute(
            [(3, Money::from_cents(333))],
            TaxRate::from_bps(2000),
            false,
        )
        .unwrap();
        assert_eq!(totals.total, totals.subtotal);
        assert!(totals.tax.is_zero());
    }

    #[test]
    fn test_tax_is_applied_once_on_subtotal() {
        // Per-line rounding would give 3 × round(0.333 × 0.2) = 3 × 7 = 21
        let totals = InvoiceTotals::compute(
            [(1, Money::from_cents(33)), (1, Money::from_cents(33)), (1, Money::from_cents(33))],
            TaxRate::from_bps(2000),
            true,
        )
        .unwrap();
        assert_eq!(totals.tax.cents(), 20);
    }

    #[test]
    fn test_totals_that_do_not_fit_are_rejected() {
        let err = InvoiceTotals::compute([(i64::MAX, Money::from_cents(2))], TaxRate::zero(), false).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLarge { .. })));

        // Subtotal fits, subtotal + tax does not
        let err = InvoiceTotals::from_subtotal(Money::from_cents(i64::MAX - 1), TaxRate::from_bps(2000), true)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLarge { .. })));
    }

    #[test]
    fn test_status_transitions() {
        use InvoiceStatus::*;
        assert!(Unpaid.can_transition_to(Paid));
        assert!(Unpaid.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Unpaid));
        assert!(Pending.can_transition_to(Unpaid));
        assert!(Paid.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Pending));

        let err = Paid.transition("inv-1", Pending).unwrap_err();
        assert_eq!(err.to_string(), "Invoice inv-1 cannot move from PAID to PENDING");
    }

    #[test]
    fn test_format_invoice_number() {
        assert_eq!(format_invoice_number("INV", 42), "INV-000042");
        assert_eq!(format_invoice_number("FAC", 1_234_567), "FAC-1234567");
    }
}
